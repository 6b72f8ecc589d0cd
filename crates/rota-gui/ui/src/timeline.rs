mod driver;

use std::rc::Rc;

use rota_timeline::config::LayoutConfig;
use rota_timeline::layout::{
  BarGeometry,
  TimelineLayout
};
use rota_timeline::{
  AxisOptions,
  ItemKind,
  IntervalItem,
  PointerButton,
  SelectionRange,
  TimelineAxis,
  TimelineConfig,
  allocate_lanes,
  compute_layout
};
use web_sys::MouseEvent;
use yew::{
  Callback,
  Html,
  Properties,
  classes,
  function_component,
  html,
  use_effect_with,
  use_force_update,
  use_mut_ref,
  use_node_ref
};

use self::driver::{
  HostHooks,
  Runtime,
  apply,
  attach_wheel,
  drive,
  open_context_menu,
  pointer_input,
  teardown
};

const TIMELINE_CSS: &str =
  include_str!("../assets/timeline.css");

/// One entry of the right-click menu. `on_select` is called with no
/// arguments; the host reads whatever selection it needs itself.
#[derive(Clone, PartialEq)]
pub struct ContextMenuItem {
  pub id:        String,
  pub label:     String,
  pub disabled:  bool,
  pub on_select: Callback<()>
}

#[derive(Properties, PartialEq)]
pub struct TimelineProps {
  pub window_start:    String,
  pub window_end:      String,
  #[prop_or_default]
  pub selection_start: Option<String>,
  #[prop_or_default]
  pub selection_end:   Option<String>,
  pub items:           Rc<Vec<IntervalItem>>,
  #[prop_or_default]
  pub title:           String,
  #[prop_or_default]
  pub config:          Rc<TimelineConfig>,
  #[prop_or_default]
  pub menu_items:      Vec<ContextMenuItem>,
  pub on_selection_change:
    Callback<(String, String)>,
  #[prop_or_default]
  pub on_selection_preview:
    Option<Callback<(String, String)>>,
  #[prop_or_default]
  pub on_selection_clear:
    Option<Callback<()>>
}

#[function_component(Timeline)]
pub fn timeline(
  props: &TimelineProps
) -> Html {
  let config = Rc::clone(&props.config);
  let container = use_node_ref();
  let menu_ref = use_node_ref();
  let force = use_force_update();
  let shared = {
    let config = Rc::clone(&config);
    let container = container.clone();
    let menu_ref = menu_ref.clone();
    let force = force.clone();
    use_mut_ref(move || {
      Runtime::new(
        &config,
        container,
        menu_ref,
        Callback::from(move |()| {
          force.force_update();
        })
      )
    })
  };

  {
    let shared = shared.clone();
    use_effect_with((), move |_| {
      attach_wheel(&shared);
      tracing::debug!("timeline mounted");
      move || teardown(&shared)
    });
  }

  let axis = Rc::new(TimelineAxis::build(
    config.calendar.granularity,
    &props.window_start,
    &props.window_end,
    &AxisOptions::from_config(&config)
  ));
  let committed = SelectionRange::parse_optional(
    props.selection_start.as_deref(),
    props.selection_end.as_deref()
  );

  let (selection, menu, mode, released) = {
    let mut runtime = shared.borrow_mut();
    runtime.axis = Rc::clone(&axis);
    runtime.hooks = HostHooks {
      on_change:  props
        .on_selection_change
        .clone(),
      on_preview: props
        .on_selection_preview
        .clone(),
      on_clear:   props
        .on_selection_clear
        .clone(),
      menu_items: props.menu_items.clone()
    };
    runtime.controller.reconfigure(&config);
    let released =
      runtime.controller.sync_committed(committed);
    (
      runtime.controller.selection(),
      runtime.controller.menu().cloned(),
      runtime.controller.mode(),
      released
    )
  };
  // a host-side clear may end a gesture or close the menu
  apply(&shared, released, None);

  let plan = allocate_lanes(&*axis, &props.items);
  let layout = compute_layout(
    &axis,
    &plan,
    selection,
    &config.layout
  );

  let onmousedown = {
    let shared = shared.clone();
    Callback::from(move |event: MouseEvent| {
      let input = pointer_input(&event);
      if input.button == PointerButton::Primary {
        // keep the browser from starting a text selection
        event.prevent_default();
      }
      drive(
        &shared,
        Some(event.as_ref()),
        |runtime, metrics| {
          let axis = Rc::clone(&runtime.axis);
          metrics
            .map(|metrics| {
              runtime.controller.pointer_down(
                input,
                &metrics,
                &*axis
              )
            })
            .unwrap_or_default()
        }
      );
    })
  };

  let oncontextmenu = {
    let shared = shared.clone();
    Callback::from(move |event: MouseEvent| {
      open_context_menu(&shared, &event);
    })
  };

  let menu_html = match menu {
    | Some(menu) => {
      let buttons = menu
        .actions
        .iter()
        .map(|action| {
          let shared = shared.clone();
          let id = action.id.clone();
          let onclick =
            Callback::from(move |_: MouseEvent| {
              let id = id.clone();
              drive(&shared, None, move |runtime, _| {
                runtime.controller.invoke_action(&id)
              });
            });
          html! {
            <button
              class="rota-menu-action"
              disabled={action.disabled}
              {onclick}
            >
              { action.label.clone() }
            </button>
          }
        })
        .collect::<Html>();
      html! {
        <div
          class="rota-menu"
          ref={menu_ref.clone()}
          style={format!(
            "left: {}px; top: {}px;",
            menu.x, menu.y
          )}
        >
          <div class="rota-menu-range">
            { format!(
              "{} ({} days)",
              menu.range,
              menu.range.day_count()
            ) }
          </div>
          { buttons }
        </div>
      }
    }
    | None => html! {}
  };

  html! {
    <div
      class={classes!(
        "rota-timeline",
        format!("rota-mode-{}", mode.as_key())
      )}
    >
      <style>{ TIMELINE_CSS }</style>
      <div
        class="rota-scroll"
        ref={container}
        {onmousedown}
        {oncontextmenu}
      >
        { view_canvas(&layout, &config.layout, &props.title) }
      </div>
      { menu_html }
    </div>
  }
}

fn view_canvas(
  layout: &TimelineLayout,
  sizes: &LayoutConfig,
  title: &str
) -> Html {
  if layout.is_empty() {
    return html! {
      <div class="rota-empty">
        { "Nothing to show for this window." }
      </div>
    };
  }

  let label_width = layout.label_width;
  let month_row = layout.header_height / 2.0;
  let pitch = sizes.lane_height + sizes.lane_gap;
  let canvas_style = format!(
    "width: {}px;",
    layout.total_width
  );
  let label_style = format!(
    "width: {label_width}px;"
  );

  html! {
    <div class="rota-canvas" style={canvas_style}>
      <div class="rota-header" style={format!(
        "height: {}px;",
        layout.header_height
      )}>
        <div class="rota-corner" style={label_style.clone()}>
          { title }
        </div>
        <div
          class="rota-header-grid"
          style={format!(
            "left: {label_width}px; width: {}px;",
            layout.grid_width
          )}
        >
          { for layout.header.iter().map(|cell| html! {
            <div
              class="rota-month"
              style={format!(
                "left: {}px; width: {}px; height: {month_row}px;",
                cell.left, cell.width
              )}
            >
              { cell.label.clone() }
            </div>
          }) }
          { for layout.columns.iter().map(|column| html! {
            <div
              class={classes!(
                "rota-day",
                column.is_weekend.then_some("weekend"),
                column.is_today.then_some("today"),
                column.is_boundary.then_some("boundary")
              )}
              title={column.title.clone()}
              style={format!(
                "left: {}px; width: {}px; top: {month_row}px; height: {month_row}px;",
                column.left, layout.cell_width
              )}
            >
              { column.text.clone() }
            </div>
          }) }
        </div>
      </div>
      <div class="rota-body" style={format!(
        "height: {}px;",
        layout.body_height
      )}>
        <div class="rota-labels" style={label_style}>
          { for (0..layout.lane_count).map(|lane| html! {
            <div
              class="rota-lane-label"
              style={format!(
                "top: {}px; height: {}px;",
                lane as f64 * pitch,
                pitch
              )}
            >
              { format!("Lane {}", lane + 1) }
            </div>
          }) }
        </div>
        <div
          class="rota-grid"
          style={format!(
            "left: {label_width}px; width: {}px;",
            layout.grid_width
          )}
        >
          { for layout.columns.iter().map(|column| html! {
            <div
              class={classes!(
                "rota-cell",
                column.is_weekend.then_some("weekend"),
                column.is_boundary.then_some("boundary")
              )}
              style={format!(
                "left: {}px; width: {}px;",
                column.left, layout.cell_width
              )}
            />
          }) }
          { view_overlay(layout) }
          { for layout.bars.iter().map(view_bar) }
          {
            layout.today_left.map(|left| html! {
              <div
                class="rota-today"
                style={format!("left: {left}px;")}
              />
            }).unwrap_or_default()
          }
        </div>
      </div>
    </div>
  }
}

fn view_overlay(layout: &TimelineLayout) -> Html {
  let Some(overlay) = &layout.overlay else {
    return html! {};
  };
  html! {
    <div
      class={classes!(
        "rota-selection",
        overlay.clipped_start.then_some("clipped-start"),
        overlay.clipped_end.then_some("clipped-end")
      )}
      title={overlay.range.to_string()}
      style={format!(
        "left: {}px; width: {}px;",
        overlay.left, overlay.width
      )}
    />
  }
}

fn view_bar(bar: &BarGeometry) -> Html {
  let kind = match bar.kind {
    | ItemKind::Booking => "booking",
    | ItemKind::Reservation => "reservation"
  };
  let tooltip = match &bar.sublabel {
    | Some(sublabel) => {
      format!("{} · {sublabel}", bar.label)
    }
    | None => bar.label.clone()
  };
  html! {
    <div
      class={classes!(
        "rota-bar",
        kind,
        bar.cancelled.then_some("cancelled"),
        bar.clipped_start.then_some("clipped-start"),
        bar.clipped_end.then_some("clipped-end")
      )}
      title={tooltip}
      data-item={bar.id.clone()}
      style={format!(
        "left: {}px; top: {}px; width: {}px; height: {}px;",
        bar.left, bar.top, bar.width, bar.height
      )}
    >
      <span class="rota-bar-label">{ bar.label.clone() }</span>
      {
        bar.sublabel.as_ref().map(|sublabel| html! {
          <span class="rota-bar-sublabel">{ sublabel.clone() }</span>
        }).unwrap_or_default()
      }
    </div>
  }
}
