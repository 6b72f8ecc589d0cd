use std::cell::RefCell;
use std::rc::{
  Rc,
  Weak
};

use gloo::events::{
  EventListener,
  EventListenerOptions
};
use gloo::render::{
  AnimationFrame,
  request_animation_frame
};
use rota_timeline::{
  Effect,
  ListenerScope,
  MenuAction,
  PointerButton,
  PointerInput,
  SelectionController,
  TimelineAxis,
  TimelineConfig,
  ViewportMetrics,
  WheelDeltaMode
};
use wasm_bindgen::JsCast;
use web_sys::{
  Element,
  Event,
  KeyboardEvent,
  MouseEvent,
  Node,
  WheelEvent
};
use yew::{
  Callback,
  NodeRef
};

use super::ContextMenuItem;

pub(crate) type Shared = Rc<RefCell<Runtime>>;

/// The host callbacks as of the latest render.
#[derive(Clone, Default)]
pub(crate) struct HostHooks {
  pub on_change:  Callback<(String, String)>,
  pub on_preview: Option<Callback<(String, String)>>,
  pub on_clear:   Option<Callback<()>>,
  pub menu_items: Vec<ContextMenuItem>
}

impl HostHooks {
  fn menu_actions(&self) -> Vec<MenuAction> {
    self
      .menu_items
      .iter()
      .map(|item| {
        MenuAction::new(
          item.id.clone(),
          item.label.clone()
        )
        .disabled(item.disabled)
      })
      .collect()
  }
}

/// Browser-side half of the timeline: owns the controller plus every
/// listener and frame handle the controller asks for.
pub(crate) struct Runtime {
  pub controller:  SelectionController,
  pub axis:        Rc<TimelineAxis>,
  pub hooks:       HostHooks,
  pub container:   NodeRef,
  pub menu:        NodeRef,
  pub redraw:      Callback<()>,
  drag_listeners:  Vec<EventListener>,
  menu_listeners:  Vec<EventListener>,
  wheel_listener:  Option<EventListener>,
  frame:           Option<AnimationFrame>,
  /// The handle of the frame currently running; dropped on the next
  /// request rather than from inside its own callback.
  spent_frame:     Option<AnimationFrame>
}

impl Runtime {
  pub fn new(
    config: &TimelineConfig,
    container: NodeRef,
    menu: NodeRef,
    redraw: Callback<()>
  ) -> Self {
    Self {
      controller: SelectionController::new(
        config
      ),
      axis: Rc::new(TimelineAxis::Days(
        rota_timeline::DayAxis::empty()
      )),
      hooks: HostHooks::default(),
      container,
      menu,
      redraw,
      drag_listeners: Vec::new(),
      menu_listeners: Vec::new(),
      wheel_listener: None,
      frame: None,
      spent_frame: None
    }
  }

  fn metrics(&self) -> Option<ViewportMetrics> {
    let element =
      self.container.cast::<Element>()?;
    let rect =
      element.get_bounding_client_rect();
    Some(ViewportMetrics {
      left:         rect.left(),
      width:        f64::from(
        element.client_width()
      ),
      scroll_left:  f64::from(
        element.scroll_left()
      ),
      scroll_width: f64::from(
        element.scroll_width()
      )
    })
  }

  pub fn listener_count(&self) -> usize {
    self.drag_listeners.len()
      + self.menu_listeners.len()
  }
}

pub(crate) fn pointer_input(
  event: &MouseEvent
) -> PointerInput {
  PointerInput {
    client_x: f64::from(event.client_x()),
    client_y: f64::from(event.client_y()),
    button:   PointerButton::from_dom(
      event.button()
    ),
    stamp:    event.time_stamp()
  }
}

/// Runs one controller transition with fresh viewport metrics and
/// applies whatever it returns. The runtime is never borrowed while
/// host callbacks run.
pub(crate) fn drive<F>(
  shared: &Shared,
  event: Option<&Event>,
  step: F
) where
  F: FnOnce(
    &mut Runtime,
    Option<ViewportMetrics>
  ) -> Vec<Effect>
{
  let effects = {
    let mut runtime = shared.borrow_mut();
    let metrics = runtime.metrics();
    step(&mut runtime, metrics)
  };
  apply(shared, effects, event);
}

pub(crate) fn apply(
  shared: &Shared,
  effects: Vec<Effect>,
  event: Option<&Event>
) {
  if effects.is_empty() {
    return;
  }
  let mut visual = false;

  for effect in effects {
    match effect {
      | Effect::Subscribe(scope) => {
        subscribe(shared, scope);
      }
      | Effect::Unsubscribe(scope) => {
        let retired = {
          let mut runtime = shared.borrow_mut();
          match scope {
            | ListenerScope::Drag => {
              std::mem::take(
                &mut runtime.drag_listeners
              )
            }
            | ListenerScope::Menu => {
              std::mem::take(
                &mut runtime.menu_listeners
              )
            }
          }
        };
        tracing::trace!(
          ?scope,
          released = retired.len(),
          "released timeline listeners"
        );
        drop(retired);
      }
      | Effect::RequestFrame => {
        let weak = Rc::downgrade(shared);
        let handle =
          request_animation_frame(move |_| {
            on_frame(&weak);
          });
        shared.borrow_mut().frame = Some(handle);
      }
      | Effect::CancelFrame => {
        let pending =
          shared.borrow_mut().frame.take();
        drop(pending);
      }
      | Effect::ScrollTo(left) => {
        let element = shared
          .borrow()
          .container
          .cast::<Element>();
        if let Some(element) = element {
          let top =
            f64::from(element.scroll_top());
          element
            .scroll_to_with_x_and_y(left, top);
        }
      }
      | Effect::PreventDefault => {
        if let Some(event) = event {
          event.prevent_default();
        }
      }
      | Effect::SelectionChanged(range) => {
        let callback =
          shared.borrow().hooks.on_change.clone();
        callback.emit(range.to_iso_pair());
        visual = true;
      }
      | Effect::SelectionPreview(range) => {
        let callback = shared
          .borrow()
          .hooks
          .on_preview
          .clone();
        if let Some(callback) = callback {
          callback.emit(range.to_iso_pair());
        }
        visual = true;
      }
      | Effect::SelectionCleared => {
        let callback =
          shared.borrow().hooks.on_clear.clone();
        if let Some(callback) = callback {
          callback.emit(());
        }
        visual = true;
      }
      | Effect::MenuOpened
      | Effect::MenuClosed => {
        visual = true;
      }
      | Effect::InvokeAction(id) => {
        let callback = shared
          .borrow()
          .hooks
          .menu_items
          .iter()
          .find(|item| item.id == id)
          .map(|item| item.on_select.clone());
        match callback {
          | Some(callback) => {
            tracing::debug!(
              action = %id,
              "invoking timeline menu action"
            );
            callback.emit(());
          }
          | None => {
            tracing::warn!(
              action = %id,
              "menu action vanished before \
               invocation"
            );
          }
        }
      }
    }
  }

  let redraw = {
    let runtime = shared.borrow();
    (visual && !runtime.controller.is_torn_down())
      .then(|| runtime.redraw.clone())
  };
  if let Some(redraw) = redraw {
    redraw.emit(());
  }
}

fn subscribe(
  shared: &Shared,
  scope: ListenerScope
) {
  let Some(window) = web_sys::window() else {
    tracing::warn!(
      ?scope,
      "no window; listeners not attached"
    );
    return;
  };

  match scope {
    | ListenerScope::Drag => {
      let on_move = {
        let weak = Rc::downgrade(shared);
        EventListener::new(
          &window,
          "mousemove",
          move |event| {
            let Some(shared) = weak.upgrade()
            else {
              return;
            };
            let Some(mouse) =
              event.dyn_ref::<MouseEvent>()
            else {
              return;
            };
            let x = f64::from(mouse.client_x());
            drive(
              &shared,
              Some(event),
              |runtime, metrics| {
                let axis = Rc::clone(&runtime.axis);
                metrics
                  .map(|metrics| {
                    runtime.controller.pointer_move(
                      x,
                      &metrics,
                      &*axis
                    )
                  })
                  .unwrap_or_default()
              }
            );
          }
        )
      };
      let on_up = {
        let weak = Rc::downgrade(shared);
        EventListener::new(
          &window,
          "mouseup",
          move |event| {
            let Some(shared) = weak.upgrade()
            else {
              return;
            };
            let Some(mouse) =
              event.dyn_ref::<MouseEvent>()
            else {
              return;
            };
            let x = f64::from(mouse.client_x());
            drive(
              &shared,
              Some(event),
              |runtime, metrics| {
                let axis = Rc::clone(&runtime.axis);
                metrics
                  .map(|metrics| {
                    runtime.controller.pointer_up(
                      x,
                      &metrics,
                      &*axis
                    )
                  })
                  .unwrap_or_default()
              }
            );
          }
        )
      };
      let on_key = key_listener(&window, shared);
      shared.borrow_mut().drag_listeners =
        vec![on_move, on_up, on_key];
    }
    | ListenerScope::Menu => {
      let on_down = {
        let weak = Rc::downgrade(shared);
        EventListener::new(
          &window,
          "mousedown",
          move |event| {
            let Some(shared) = weak.upgrade()
            else {
              return;
            };
            let Some(mouse) =
              event.dyn_ref::<MouseEvent>()
            else {
              return;
            };
            let input = pointer_input(mouse);
            let inside = {
              let runtime = shared.borrow();
              let menu =
                runtime.menu.cast::<Node>();
              let target = event
                .target()
                .and_then(|target| {
                  target.dyn_into::<Node>().ok()
                });
              match (menu, target) {
                | (Some(menu), Some(target)) => {
                  menu.contains(Some(&target))
                }
                | _ => false
              }
            };
            drive(
              &shared,
              Some(event),
              |runtime, _| {
                runtime
                  .controller
                  .pointer_down_outside(
                    input, inside
                  )
              }
            );
          }
        )
      };
      let on_key = key_listener(&window, shared);
      shared.borrow_mut().menu_listeners =
        vec![on_down, on_key];
    }
  }
  tracing::trace!(
    ?scope,
    "attached timeline listeners"
  );
}

fn key_listener(
  window: &web_sys::Window,
  shared: &Shared
) -> EventListener {
  let weak = Rc::downgrade(shared);
  EventListener::new(
    window,
    "keydown",
    move |event| {
      let Some(shared) = weak.upgrade() else {
        return;
      };
      let Some(key) =
        event.dyn_ref::<KeyboardEvent>()
      else {
        return;
      };
      let key = key.key();
      drive(&shared, Some(event), |runtime, _| {
        runtime.controller.key_down(&key)
      });
    }
  )
}

fn on_frame(weak: &Weak<RefCell<Runtime>>) {
  let Some(shared) = weak.upgrade() else {
    return;
  };
  {
    let mut runtime = shared.borrow_mut();
    let fired = runtime.frame.take();
    runtime.spent_frame = fired;
  }
  drive(&shared, None, |runtime, metrics| {
    let axis = Rc::clone(&runtime.axis);
    match metrics {
      | Some(metrics) => runtime
        .controller
        .frame(&metrics, &*axis),
      // unmounted container: keep the loop alive without scrolling
      | None => {
        runtime.controller.frame(
          &ViewportMetrics {
            left:         0.0,
            width:        0.0,
            scroll_left:  0.0,
            scroll_width: 0.0
          },
          &*axis
        )
      }
    }
  });
}

/// Attaches the non-passive wheel listener on the scroll container.
pub(crate) fn attach_wheel(shared: &Shared) {
  let Some(element) = shared
    .borrow()
    .container
    .cast::<Element>()
  else {
    return;
  };
  let weak = Rc::downgrade(shared);
  let listener = EventListener::new_with_options(
    &element,
    "wheel",
    EventListenerOptions::enable_prevent_default(),
    move |event| {
      let Some(shared) = weak.upgrade() else {
        return;
      };
      let Some(wheel) =
        event.dyn_ref::<WheelEvent>()
      else {
        return;
      };
      let (dx, dy) =
        (wheel.delta_x(), wheel.delta_y());
      let mode =
        WheelDeltaMode::from_dom(wheel.delta_mode());
      drive(
        &shared,
        Some(event),
        |runtime, metrics| {
          metrics
            .map(|metrics| {
              runtime
                .controller
                .wheel(dx, dy, mode, &metrics)
            })
            .unwrap_or_default()
        }
      );
    }
  );
  shared.borrow_mut().wheel_listener =
    Some(listener);
}

/// Unmount: the controller releases everything it holds, then the
/// wheel listener and any spent frame go with it.
pub(crate) fn teardown(shared: &Shared) {
  let effects =
    shared.borrow_mut().controller.teardown();
  apply(shared, effects, None);

  let (wheel, spent, leftover) = {
    let mut runtime = shared.borrow_mut();
    (
      runtime.wheel_listener.take(),
      runtime.spent_frame.take(),
      runtime.listener_count()
    )
  };
  drop(wheel);
  drop(spent);
  if leftover > 0 {
    tracing::error!(
      leftover,
      "timeline listeners survived teardown"
    );
  } else {
    tracing::debug!("timeline runtime torn down");
  }
}

pub(crate) fn open_context_menu(
  shared: &Shared,
  event: &MouseEvent
) {
  let input = pointer_input(event);
  drive(
    shared,
    Some(event.as_ref()),
    |runtime, metrics| {
      let Some(metrics) = metrics else {
        return Vec::new();
      };
      let actions = runtime.hooks.menu_actions();
      let axis = Rc::clone(&runtime.axis);
      runtime.controller.context_menu(
        input,
        &metrics,
        &*axis,
        &actions
      )
    }
  );
}
