mod demo;

use std::rc::Rc;

use rota_timeline::date::format_iso;
use rota_timeline::{
  InteractionMode,
  IntervalItem,
  ItemKind,
  SelectionRange,
  TimelineConfig
};
use web_sys::MouseEvent;
use yew::{
  Callback,
  Html,
  UseStateHandle,
  classes,
  function_component,
  html,
  use_memo,
  use_state
};

use self::demo::{
  DEMO_ITEMS_JSON,
  conflicts,
  load_demo,
  next_item_id,
  shift_month,
  window_for
};
use crate::timeline::{
  ContextMenuItem,
  Timeline
};

const TIMELINE_CONFIG_TOML: &str =
  include_str!("../assets/timeline.toml");
const MODE_STORAGE_KEY: &str =
  "rota.timeline.mode";
const VISIBLE_MONTHS: u32 = 2;
const LOG_LIMIT: usize = 8;

fn load_timeline_config() -> TimelineConfig {
  TimelineConfig::from_toml_or_default(
    TIMELINE_CONFIG_TOML,
    "assets/timeline.toml"
  )
}

fn local_storage() -> Option<web_sys::Storage> {
  web_sys::window().and_then(|window| {
    window.local_storage().ok().flatten()
  })
}

fn load_mode(
  fallback: InteractionMode
) -> InteractionMode {
  local_storage()
    .and_then(|storage| {
      storage
        .get_item(MODE_STORAGE_KEY)
        .ok()
        .flatten()
    })
    .and_then(|raw| {
      InteractionMode::from_key(&raw)
    })
    .unwrap_or(fallback)
}

fn save_mode(mode: InteractionMode) {
  if let Some(storage) = local_storage() {
    let _ = storage.set_item(
      MODE_STORAGE_KEY,
      mode.as_key()
    );
  }
}

fn with_entry(
  log: &[String],
  entry: String
) -> Vec<String> {
  std::iter::once(entry)
    .chain(log.iter().cloned())
    .take(LOG_LIMIT)
    .collect()
}

fn describe(
  range: Option<&(String, String)>
) -> String {
  match range {
    | Some((start, end)) if start == end => {
      start.clone()
    }
    | Some((start, end)) => {
      format!("{start} – {end}")
    }
    | None => "none".to_string()
  }
}

fn add_item_callback(
  kind: ItemKind,
  label: &'static str,
  range: Option<SelectionRange>,
  items: UseStateHandle<Rc<Vec<IntervalItem>>>,
  selection: UseStateHandle<
    Option<(String, String)>
  >,
  log: UseStateHandle<Vec<String>>
) -> Callback<()> {
  Callback::from(move |()| {
    let Some(range) = range else {
      return;
    };
    let mut next = (**items).clone();
    let id = next_item_id(&next, kind);
    let (start, end) = range.to_iso_pair();
    next.push(IntervalItem::new(
      id.clone(),
      kind,
      start,
      end,
      label
    ));
    tracing::info!(
      %id,
      kind = kind.as_key(),
      %range,
      "added item from selection"
    );
    items.set(Rc::new(next));
    selection.set(None);
    log.set(with_entry(
      &log,
      format!(
        "{} {id} for {range}",
        kind.as_key()
      )
    ));
  })
}

#[function_component(App)]
pub fn app() -> Html {
  let base = use_memo((), |_| {
    load_timeline_config()
  });
  let today = base.today();
  let mode = {
    let fallback = base.interaction.mode;
    use_state(move || load_mode(fallback))
  };
  let config = {
    let base = Rc::clone(&base);
    use_memo(*mode, move |mode| {
      let mut config = (*base).clone();
      config.interaction.mode = *mode;
      config
    })
  };
  let document = use_memo((), move |_| {
    load_demo(DEMO_ITEMS_JSON, today)
  });
  let items = {
    let document = Rc::clone(&document);
    use_state(move || {
      Rc::new(document.items.clone())
    })
  };
  let anchor =
    use_state(move || today);
  let selection =
    use_state(|| None::<(String, String)>);
  let preview =
    use_state(|| None::<(String, String)>);
  let log = use_state(Vec::<String>::new);

  let (window_start, window_end) =
    window_for(*anchor, VISIBLE_MONTHS);
  let committed =
    (*selection).as_ref().and_then(
      |(start, end)| {
        SelectionRange::parse(start, end)
      }
    );
  let blocked = committed
    .is_some_and(|range| {
      conflicts(&items, range)
    });

  let on_selection_change = {
    let selection = selection.clone();
    let preview = preview.clone();
    Callback::from(
      move |range: (String, String)| {
        tracing::debug!(
          start = %range.0,
          end = %range.1,
          "selection changed"
        );
        selection.set(Some(range));
        preview.set(None);
      }
    )
  };
  let on_selection_preview = {
    let preview = preview.clone();
    Callback::from(
      move |range: (String, String)| {
        preview.set(Some(range));
      }
    )
  };
  let on_selection_clear = {
    let selection = selection.clone();
    let preview = preview.clone();
    Callback::from(move |()| {
      selection.set(None);
      preview.set(None);
    })
  };

  let clear_action = {
    let selection = selection.clone();
    let log = log.clone();
    Callback::from(move |()| {
      selection.set(None);
      log.set(with_entry(
        &log,
        "cleared selection".to_string()
      ));
    })
  };
  let menu_items = vec![
    ContextMenuItem {
      id:        "book".to_string(),
      label:     "Book these dates"
        .to_string(),
      disabled:  blocked,
      on_select: add_item_callback(
        ItemKind::Booking,
        "Walk-in",
        committed,
        items.clone(),
        selection.clone(),
        log.clone()
      )
    },
    ContextMenuItem {
      id:        "reserve".to_string(),
      label:     "Hold for maintenance"
        .to_string(),
      disabled:  blocked,
      on_select: add_item_callback(
        ItemKind::Reservation,
        "Maintenance hold",
        committed,
        items.clone(),
        selection.clone(),
        log.clone()
      )
    },
    ContextMenuItem {
      id:        "clear".to_string(),
      label:     "Clear selection"
        .to_string(),
      disabled:  false,
      on_select: clear_action
    },
  ];

  let shift = |delta: i32| {
    let anchor = anchor.clone();
    Callback::from(move |_: MouseEvent| {
      anchor.set(shift_month(*anchor, delta));
    })
  };
  let on_prev = shift(-1);
  let on_next = shift(1);
  let on_today = {
    let anchor = anchor.clone();
    Callback::from(move |_: MouseEvent| {
      anchor.set(today);
    })
  };

  let mode_button = |choice: InteractionMode,
                     label: &'static str| {
    let mode = mode.clone();
    let selection = selection.clone();
    let onclick = Callback::from(move |_: MouseEvent| {
      save_mode(choice);
      mode.set(choice);
      selection.set(None);
    });
    html! {
      <button
        class={classes!(
          "btn",
          (*mode == choice).then_some("active")
        )}
        {onclick}
      >
        { label }
      </button>
    }
  };

  html! {
    <div class="app">
      <div class="topbar">
        <div class="brand">{ "Rota" }</div>
        <button class="btn" onclick={on_prev}>{ "‹" }</button>
        <button class="btn" onclick={on_today}>{ "Today" }</button>
        <button class="btn" onclick={on_next}>{ "›" }</button>
        <span class="window">
          { format!(
            "{} – {}",
            format_iso(window_start),
            format_iso(window_end)
          ) }
        </span>
        <div class="modes">
          { mode_button(InteractionMode::Drag, "Drag") }
          { mode_button(InteractionMode::DeferredCommit, "Deferred") }
          { mode_button(InteractionMode::ClickClick, "Click-click") }
        </div>
      </div>
      <Timeline
        window_start={format_iso(window_start)}
        window_end={format_iso(window_end)}
        selection_start={(*selection).as_ref().map(|range| range.0.clone())}
        selection_end={(*selection).as_ref().map(|range| range.1.clone())}
        items={Rc::clone(&items)}
        title={document.resource.clone()}
        config={config}
        {menu_items}
        {on_selection_change}
        on_selection_preview={Some(on_selection_preview)}
        on_selection_clear={Some(on_selection_clear)}
      />
      <div class="status">
        <span>{ format!("Selected: {}", describe((*selection).as_ref())) }</span>
        {
          (*preview).as_ref().map(|range| html! {
            <span class="preview">
              { format!("Previewing: {}", describe(Some(range))) }
            </span>
          }).unwrap_or_default()
        }
        {
          blocked.then(|| html! {
            <span class="warn">{ "Overlaps an existing item" }</span>
          }).unwrap_or_default()
        }
      </div>
      <ul class="log">
        { for log.iter().map(|entry| html! { <li>{ entry.clone() }</li> }) }
      </ul>
    </div>
  }
}
