// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hover tooltips sharing one popup.
//!
//! Two toolbar buttons show the same keyed tooltip. Moving from one button to
//! the other hands the open tooltip over without waiting for the show delay.
//! The host here is a console "document" that prints every mutation.
//!
//! Run:
//! - `RUST_LOG=understory_popup=debug cargo run -p understory_popup_demos --example popup_hover`

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use kurbo::Rect;
use understory_popup::binder::{Target, TriggerEvent};
use understory_popup::host::{Host, RectCallback, Renderer, Unwatch};
use understory_popup::options::{AlignOptions, TransitionDirection, TransitionSpec};
use understory_popup::shared::SharedPopups;
use understory_popup::timer::{ManualScheduler, Scheduler};
use understory_popup::{PopupBinding, PopupEvent, PopupOptions};

const SAVE: u32 = 1;
const OPEN: u32 = 2;

struct ConsoleHost {
    body: RefCell<Vec<u32>>,
    next: Cell<u32>,
    clock: Rc<ManualScheduler>,
    spawner: LocalSpawner,
}

impl Host for ConsoleHost {
    type Element = u32;
    type Template = String;
    type Rendered = u32;

    fn render(&self, renderer: Renderer<String>, trigger: &u32) -> u32 {
        let id = self.next.get() + 1;
        self.next.set(id);
        println!("  render #{id} for button {trigger}: {:?}", renderer());
        id
    }

    fn rerender(&self, rendered: &u32, renderer: Renderer<String>) {
        println!("  rerender #{rendered}: {:?}", renderer());
    }

    fn first_element(&self, rendered: &u32) -> Option<u32> {
        Some(*rendered)
    }

    fn until_settled(&self) -> LocalBoxFuture<'static, ()> {
        future::ready(()).boxed_local()
    }

    fn is_popup_root(&self, _element: &u32) -> bool {
        true
    }

    fn append_to_body(&self, element: &u32) {
        let mut body = self.body.borrow_mut();
        body.retain(|e| e != element);
        body.push(*element);
        println!("  attach #{element}, body = {body:?}");
    }

    fn remove(&self, element: &u32) {
        let mut body = self.body.borrow_mut();
        body.retain(|e| e != element);
        println!("  detach #{element}, body = {body:?}");
    }

    fn is_attached(&self, element: &u32) -> bool {
        self.body.borrow().contains(element)
    }

    fn set_pointable(&self, _element: &u32, _pointable: bool) {}

    fn query(&self, _trigger: &u32, _selector: &str) -> Option<u32> {
        None
    }

    fn try_focus(&self, _element: &u32) -> bool {
        false
    }

    fn align(&self, content: &u32, anchor: &u32, options: &AlignOptions) -> bool {
        println!("  align #{content} to button {anchor} ({})", options.position);
        true
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, 1024.0, 768.0)
    }

    fn watch_rect(&self, _element: &u32, _callback: RectCallback) -> Unwatch {
        Box::new(|| {})
    }

    fn transition(
        &self,
        element: &u32,
        spec: &TransitionSpec,
        direction: TransitionDirection,
    ) -> LocalBoxFuture<'static, bool> {
        println!("  {direction:?} transition {} on #{element}", spec.name);
        future::ready(true).boxed_local()
    }

    fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.clock.clone()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        if let Err(err) = self.spawner.spawn_local(task) {
            eprintln!("executor shut down: {err}");
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut pool = LocalPool::new();
    let clock = Rc::new(ManualScheduler::new());
    let host = Rc::new(ConsoleHost {
        body: RefCell::new(Vec::new()),
        next: Cell::new(100),
        clock: clock.clone(),
        spawner: pool.spawner(),
    });
    let shared = SharedPopups::new();

    let options: PopupOptions<u32> =
        serde_json::from_str(r#"{ "key": "toolbar-tip", "showDelay": 300, "hideDelay": 150 }"#)
            .expect("valid options");

    let buttons = [(SAVE, "Save"), (OPEN, "Open")].map(|(id, label)| {
        let binding = PopupBinding::new(host.clone(), id, shared.clone());
        binding.subscribe(move |event| {
            if let PopupEvent::OpenedChange(opened) = event {
                println!("  [{label}] opened = {opened}");
            }
        });
        let text = format!("{label} the document");
        binding.update(Rc::new(move || text.clone()), options.clone());
        binding.connect();
        binding
    });
    let [save, open] = &buttons;

    let mut step = |title: &str, ms: u64| {
        clock.advance(Duration::from_millis(ms));
        pool.run_until_stalled();
        println!("{title} (t = {:?})", clock.now());
    };

    println!("pointer enters Save");
    save.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    step("show delay elapsed", 300);

    println!("pointer slides from Save to Open");
    save.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    open.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    step("handed over without delay", 0);
    assert!(open.is_opened() && !save.is_opened());

    println!("pointer leaves Open");
    open.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    step("hide delay elapsed", 150);
    assert!(host.body.borrow().is_empty());
}
