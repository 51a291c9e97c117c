// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use super::*;

use std::collections::HashMap;

use futures::channel::oneshot;
use futures::executor::{LocalPool, LocalSpawner};
use futures::future::{self, FutureExt, LocalBoxFuture};
use futures::task::LocalSpawnExt;
use kurbo::Rect;

use crate::binder::Target;
use crate::host::RectCallback;
use crate::options::{AlignOptions, AlignTo, TransitionSpec};
use crate::timer::{ManualScheduler, Scheduler};

type El = u32;

const TRIGGER: El = 1;
const OTHER_TRIGGER: El = 2;

#[derive(Default)]
struct Dom {
    next_el: El,
    /// Body children, in order.
    body: Vec<El>,
    templates: HashMap<El, &'static str>,
    pointable: HashMap<El, bool>,
    selectors: HashMap<String, El>,
    focused: Option<El>,
    renders: u32,
    rerenders: u32,
    aligns: Vec<(El, El)>,
    align_fails: bool,
    transitions: Vec<(El, TransitionDirection)>,
    leaving: Vec<(El, oneshot::Sender<bool>)>,
}

type Watchers = Rc<RefCell<Vec<(u64, El, Rc<dyn Fn(Rect)>)>>>;

struct TestHost {
    dom: RefCell<Dom>,
    watchers: Watchers,
    next_watch: Cell<u64>,
    clock: Rc<ManualScheduler>,
    spawner: LocalSpawner,
}

impl Host for TestHost {
    type Element = El;
    type Template = &'static str;
    type Rendered = El;

    fn render(&self, renderer: Renderer<&'static str>, _trigger: &El) -> El {
        let mut dom = self.dom.borrow_mut();
        dom.next_el += 1;
        let el = 100 + dom.next_el;
        dom.templates.insert(el, renderer());
        dom.renders += 1;
        el
    }

    fn rerender(&self, rendered: &El, renderer: Renderer<&'static str>) {
        let mut dom = self.dom.borrow_mut();
        dom.templates.insert(*rendered, renderer());
        dom.rerenders += 1;
    }

    fn first_element(&self, rendered: &El) -> Option<El> {
        match self.dom.borrow().templates.get(rendered) {
            Some(&"empty") | None => None,
            Some(_) => Some(*rendered),
        }
    }

    fn until_settled(&self) -> LocalBoxFuture<'static, ()> {
        future::ready(()).boxed_local()
    }

    fn is_popup_root(&self, element: &El) -> bool {
        self.dom.borrow().templates.get(element) != Some(&"plain")
    }

    fn append_to_body(&self, element: &El) {
        let mut dom = self.dom.borrow_mut();
        dom.body.retain(|e| e != element);
        dom.body.push(*element);
    }

    fn remove(&self, element: &El) {
        self.dom.borrow_mut().body.retain(|e| e != element);
    }

    fn is_attached(&self, element: &El) -> bool {
        self.dom.borrow().body.contains(element)
    }

    fn set_pointable(&self, element: &El, pointable: bool) {
        self.dom.borrow_mut().pointable.insert(*element, pointable);
    }

    fn query(&self, _trigger: &El, selector: &str) -> Option<El> {
        self.dom.borrow().selectors.get(selector).copied()
    }

    fn try_focus(&self, element: &El) -> bool {
        self.dom.borrow_mut().focused = Some(*element);
        true
    }

    fn align(&self, content: &El, anchor: &El, _options: &AlignOptions) -> bool {
        let mut dom = self.dom.borrow_mut();
        dom.aligns.push((*content, *anchor));
        !dom.align_fails
    }

    fn viewport(&self) -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }

    fn watch_rect(&self, element: &El, callback: RectCallback) -> Unwatch {
        let id = self.next_watch.get() + 1;
        self.next_watch.set(id);
        self.watchers
            .borrow_mut()
            .push((id, *element, Rc::from(callback)));
        let watchers = self.watchers.clone();
        Box::new(move || watchers.borrow_mut().retain(|(w, ..)| *w != id))
    }

    fn transition(
        &self,
        element: &El,
        _spec: &TransitionSpec,
        direction: TransitionDirection,
    ) -> LocalBoxFuture<'static, bool> {
        let mut dom = self.dom.borrow_mut();
        dom.transitions.push((*element, direction));
        match direction {
            TransitionDirection::Enter => {
                // Entering interrupts a leave in flight on the same element.
                let (interrupted, rest) = core::mem::take(&mut dom.leaving)
                    .into_iter()
                    .partition::<Vec<_>, _>(|(e, _)| e == element);
                dom.leaving = rest;
                for (_, tx) in interrupted {
                    let _ = tx.send(false);
                }
                future::ready(true).boxed_local()
            }
            TransitionDirection::Leave => {
                let (tx, rx) = oneshot::channel();
                dom.leaving.push((*element, tx));
                rx.map(|r| r.unwrap_or(false)).boxed_local()
            }
        }
    }

    fn scheduler(&self) -> Rc<dyn Scheduler> {
        self.clock.clone()
    }

    fn spawn(&self, task: LocalBoxFuture<'static, ()>) {
        self.spawner.spawn_local(task).unwrap();
    }
}

struct Harness {
    pool: LocalPool,
    host: Rc<TestHost>,
    shared: HostPopups<TestHost>,
}

type Events = Rc<RefCell<Vec<PopupEvent>>>;

impl Harness {
    fn new() -> Self {
        let pool = LocalPool::new();
        let host = Rc::new(TestHost {
            dom: RefCell::new(Dom::default()),
            watchers: Rc::default(),
            next_watch: Cell::new(0),
            clock: Rc::new(ManualScheduler::new()),
            spawner: pool.spawner(),
        });
        Self {
            pool,
            host,
            shared: SharedPopups::new(),
        }
    }

    fn bind(&self, trigger: El, options: PopupOptions<El>) -> (PopupBinding<TestHost>, Events) {
        let binding = PopupBinding::new(self.host.clone(), trigger, self.shared.clone());
        let events: Events = Rc::default();
        let sink = events.clone();
        binding.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        binding.update(template("menu"), options);
        binding.connect();
        (binding, events)
    }

    fn run(&mut self) {
        self.pool.run_until_stalled();
    }

    fn advance(&mut self, ms: u64) {
        self.host.clock.advance(Duration::from_millis(ms));
        self.run();
    }

    fn finish_leaves(&mut self) {
        let leaving = core::mem::take(&mut self.host.dom.borrow_mut().leaving);
        for (_, tx) in leaving {
            let _ = tx.send(true);
        }
        self.run();
    }

    fn move_trigger(&self, trigger: El, rect: Rect) {
        let callbacks: Vec<_> = self
            .host
            .watchers
            .borrow()
            .iter()
            .filter(|(_, el, _)| *el == trigger)
            .map(|(.., cb)| cb.clone())
            .collect();
        for cb in callbacks {
            cb(rect);
        }
    }

    fn dom(&self) -> core::cell::Ref<'_, Dom> {
        self.host.dom.borrow()
    }
}

fn template(t: &'static str) -> Renderer<&'static str> {
    Rc::new(move || t)
}

fn hover() -> PopupOptions<El> {
    PopupOptions::default()
}

fn instant(trigger: TriggerType) -> PopupOptions<El> {
    PopupOptions {
        trigger,
        transition: None,
        ..PopupOptions::default()
    }
}

/// Hover a default binding open and let the show sequence complete.
fn hover_open(h: &mut Harness, binding: &PopupBinding<TestHost>) {
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    h.advance(100);
    assert!(binding.is_opened());
}

#[test]
fn hover_shows_after_delay() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, hover());
    assert_eq!(binding.listeners(), Listeners::ENTER);

    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    assert_eq!(binding.listeners(), Listeners::ENTER | Listeners::LEAVE_TRIGGER);
    h.advance(99);
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());

    h.advance(1);
    assert!(binding.is_opened());
    let popup = binding.popup().unwrap();
    assert_eq!(h.dom().body, vec![popup]);
    assert_eq!(h.dom().aligns, vec![(popup, TRIGGER)]);
    assert_eq!(h.dom().pointable.get(&popup), Some(&true));
    assert_eq!(
        h.dom().transitions,
        vec![(popup, TransitionDirection::Enter)]
    );
    assert_eq!(binding.listeners(), Listeners::ENTER | Listeners::LEAVE);
    assert_eq!(
        *events.borrow(),
        vec![PopupEvent::OpenedChange(true), PopupEvent::WillAlign]
    );
    // Hover never steals focus.
    assert_eq!(h.dom().focused, None);
}

#[test]
fn leaving_before_delay_cancels_show() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, hover());
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    h.advance(50);
    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    assert_eq!(binding.listeners(), Listeners::ENTER);
    h.advance(500);
    assert!(!binding.is_opened());
    assert!(events.borrow().is_empty());
    assert_eq!(h.dom().renders, 0);
}

#[test]
fn leaving_hides_after_delay_and_transition() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, hover());
    hover_open(&mut h, &binding);
    let popup = binding.popup().unwrap();
    assert_eq!(h.host.watchers.borrow().len(), 1);

    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    assert!(binding.state().will_hide_soon());
    h.advance(199);
    assert!(binding.is_opened());

    h.advance(1);
    assert!(!binding.is_opened());
    // Still attached while the leave transition plays.
    assert_eq!(h.dom().body, vec![popup]);

    h.finish_leaves();
    assert!(h.dom().body.is_empty());
    assert_eq!(binding.listeners(), Listeners::ENTER);
    assert!(h.host.watchers.borrow().is_empty());
    assert_eq!(binding.popup(), None);
    assert_eq!(events.borrow().last(), Some(&PopupEvent::OpenedChange(false)));
}

#[test]
fn moving_onto_popup_keeps_it_open() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, hover());
    hover_open(&mut h, &binding);

    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Popup));
    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    h.advance(1000);
    assert!(binding.is_opened());

    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Popup));
    assert!(binding.state().will_hide_soon());
    // Re-entering before the delay elapses cancels the hide.
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    h.advance(1000);
    assert!(binding.is_opened());
}

#[test]
fn show_during_leave_transition_keeps_content() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, hover());
    hover_open(&mut h, &binding);
    let popup = binding.popup().unwrap();

    binding.hide_popup();
    h.run();
    assert_eq!(
        h.dom().transitions.last(),
        Some(&(popup, TransitionDirection::Leave))
    );

    binding.show_popup();
    h.run();
    assert!(binding.is_opened());
    assert_eq!(h.dom().body, vec![popup]);
    assert_eq!(
        h.dom().transitions.last(),
        Some(&(popup, TransitionDirection::Enter))
    );
    assert!(h.dom().leaving.is_empty());
    assert_eq!(binding.listeners(), Listeners::ENTER | Listeners::LEAVE);
    assert_eq!(h.host.watchers.borrow().len(), 1);
}

#[test]
fn hide_before_render_settles_attaches_nothing() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, hover());
    binding.show_popup();
    binding.hide_popup();
    h.run();
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());
    assert!(h.dom().aligns.is_empty());
}

#[test]
fn click_bypasses_show_delay_and_toggles() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::Click));

    assert!(!binding.handle_trigger_event(TriggerEvent::Click));
    assert!(binding.is_opened());
    h.run();
    let popup = binding.popup().unwrap();
    assert_eq!(h.dom().body, vec![popup]);

    binding.handle_trigger_event(TriggerEvent::Click);
    assert!(!binding.is_opened());
    h.run();
    assert!(h.dom().body.is_empty());
}

#[test]
fn click_outside_hides_after_delay() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::Click));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();

    binding.handle_trigger_event(TriggerEvent::PointerDown(Target::Popup));
    assert!(!binding.state().will_hide_soon());
    binding.handle_trigger_event(TriggerEvent::PointerDown(Target::Elsewhere));
    h.advance(200);
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());
}

#[test]
fn context_menu_prevents_default() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::ContextMenu));
    assert!(binding.handle_trigger_event(TriggerEvent::ContextMenu));
    assert!(binding.is_opened());
    assert!(!binding.handle_trigger_event(TriggerEvent::Click));
    h.run();
    assert_eq!(h.dom().body.len(), 1);
}

#[test]
fn focus_shows_and_blur_hides() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            auto_focus: true,
            ..instant(TriggerType::Focus)
        },
    );
    binding.handle_trigger_event(TriggerEvent::Focus);
    assert!(binding.is_opened());
    h.run();
    // Focus-triggered popups never move focus away from the trigger.
    assert_eq!(h.dom().focused, None);

    binding.handle_trigger_event(TriggerEvent::Blur);
    h.advance(200);
    assert!(!binding.is_opened());
}

#[test]
fn auto_focus_on_click() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            auto_focus: true,
            ..instant(TriggerType::Click)
        },
    );
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();
    assert_eq!(h.dom().focused, binding.popup());
}

#[test]
fn manual_trigger_ignores_interaction() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::None));
    assert_eq!(binding.listeners(), Listeners::empty());
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.advance(1000);
    assert!(!binding.is_opened());

    binding.show_popup();
    h.run();
    assert!(binding.is_opened());
    assert_eq!(h.dom().body.len(), 1);
}

#[test]
fn show_immediately_on_connect() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            show_immediately: true,
            ..hover()
        },
    );
    assert!(binding.is_opened());
    h.run();
    assert_eq!(h.dom().body.len(), 1);
}

#[test]
fn non_pointable_popup() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            pointable: false,
            ..instant(TriggerType::None)
        },
    );
    binding.show_popup();
    h.run();
    let popup = binding.popup().unwrap();
    assert_eq!(h.dom().pointable.get(&popup), Some(&false));
}

#[test]
fn align_to_selector_falls_back_to_trigger() {
    let mut h = Harness::new();
    h.host
        .dom
        .borrow_mut()
        .selectors
        .insert(".anchor".into(), 7);
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            align_to: AlignTo::Selector(".anchor".into()),
            ..instant(TriggerType::None)
        },
    );
    binding.show_popup();
    h.run();
    let popup = binding.popup().unwrap();
    assert_eq!(h.dom().aligns.last(), Some(&(popup, 7)));

    binding.update(
        template("menu"),
        PopupOptions {
            align_to: AlignTo::Selector(".missing".into()),
            ..instant(TriggerType::None)
        },
    );
    h.run();
    assert_eq!(h.dom().aligns.last(), Some(&(popup, TRIGGER)));
}

#[test]
fn trigger_scrolled_out_of_view_hides() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::Click));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();

    h.move_trigger(TRIGGER, Rect::new(10.0, -80.0, 50.0, -40.0));
    assert!(!binding.is_opened());
    h.run();
    assert!(h.dom().body.is_empty());
    assert!(h.host.watchers.borrow().is_empty());
}

#[test]
fn trigger_move_realigns() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, instant(TriggerType::Click));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();
    let popup = binding.popup().unwrap();
    assert_eq!(h.dom().aligns.len(), 1);

    h.move_trigger(TRIGGER, Rect::new(20.0, 20.0, 60.0, 40.0));
    assert!(binding.is_opened());
    assert_eq!(h.dom().aligns, vec![(popup, TRIGGER), (popup, TRIGGER)]);
    let will_align = events
        .borrow()
        .iter()
        .filter(|e| **e == PopupEvent::WillAlign)
        .count();
    assert_eq!(will_align, 2);

    h.host.dom.borrow_mut().align_fails = true;
    h.move_trigger(TRIGGER, Rect::new(30.0, 20.0, 70.0, 40.0));
    assert!(!binding.is_opened());
}

#[test]
fn failed_alignment_hides() {
    let mut h = Harness::new();
    h.host.dom.borrow_mut().align_fails = true;
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::Click));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());
}

#[test]
fn keep_visible_defers_hide_until_released() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            keep_visible: true,
            ..hover()
        },
    );
    hover_open(&mut h, &binding);

    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    assert!(binding.prevented_hiding());
    h.advance(1000);
    assert!(binding.is_opened());

    binding.update(template("menu"), hover());
    assert!(!binding.prevented_hiding());
    assert!(binding.state().will_hide_soon());
    h.advance(200);
    assert!(!binding.is_opened());
}

#[test]
fn update_while_open_rerenders_in_place() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::None));
    binding.show_popup();
    h.run();
    let popup = binding.popup().unwrap();

    binding.update(template("menu v2"), instant(TriggerType::None));
    h.run();
    assert_eq!(binding.popup(), Some(popup));
    assert_eq!(h.dom().templates.get(&popup), Some(&"menu v2"));
    assert_eq!(h.dom().renders, 1);
    assert_eq!(h.dom().body, vec![popup]);
}

#[test]
fn non_popup_root_reports_error() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, instant(TriggerType::None));
    binding.update(template("plain"), instant(TriggerType::None));
    binding.show_popup();
    h.run();
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());
    assert_eq!(
        *events.borrow(),
        vec![
            PopupEvent::OpenedChange(true),
            PopupEvent::Error(PopupError::NotPopupRoot),
            PopupEvent::OpenedChange(false),
        ]
    );
}

#[test]
fn empty_render_reports_error() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(TRIGGER, instant(TriggerType::None));
    binding.update(template("empty"), instant(TriggerType::None));
    binding.show_popup();
    h.run();
    assert!(!binding.is_opened());
    assert!(
        events
            .borrow()
            .contains(&PopupEvent::Error(PopupError::EmptyRender))
    );
}

#[test]
fn cacheable_content_survives_hide() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(
        TRIGGER,
        PopupOptions {
            cacheable: true,
            ..instant(TriggerType::Click)
        },
    );
    binding.show_popup();
    h.run();
    let popup = binding.popup().unwrap();
    binding.hide_popup();
    h.run();
    assert!(h.dom().body.is_empty());
    assert_eq!(binding.popup(), Some(popup));

    binding.show_popup();
    h.run();
    assert_eq!(h.dom().body, vec![popup]);
    assert_eq!(h.dom().renders, 1);
    assert_eq!(binding.listeners(), Listeners::ENTER | Listeners::LEAVE);
}

#[test]
fn shared_key_switches_without_delay() {
    let mut h = Harness::new();
    let options = PopupOptions {
        key: Some("tip".into()),
        ..hover()
    };
    let (a, a_events) = h.bind(TRIGGER, options.clone());
    let (b, _) = h.bind(OTHER_TRIGGER, options);
    hover_open(&mut h, &a);
    let popup = a.popup().unwrap();

    a.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    b.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    // The shared popup is open, so no show delay applies.
    assert!(b.is_opened());
    h.run();

    assert!(!a.is_opened());
    assert_eq!(a.popup(), None);
    assert_eq!(
        a_events.borrow().last(),
        Some(&PopupEvent::OpenedChange(false))
    );
    assert_eq!(b.popup(), Some(popup));
    assert_eq!(h.dom().body, vec![popup]);
    assert_eq!(h.dom().renders, 1);
    assert_eq!(h.dom().rerenders, 1);
    assert_eq!(h.dom().aligns.last(), Some(&(popup, OTHER_TRIGGER)));
    assert_eq!(h.shared.find("tip").map(|e| e.popup), Some(popup));

    // A's pending hide died with the hand-over.
    h.advance(1000);
    assert!(b.is_opened());
    assert_eq!(h.dom().body, vec![popup]);
}

#[test]
fn shared_key_kept_visible_renders_fresh() {
    let mut h = Harness::new();
    let (a, _) = h.bind(
        TRIGGER,
        PopupOptions {
            key: Some("tip".into()),
            keep_visible: true,
            ..instant(TriggerType::None)
        },
    );
    let (b, _) = h.bind(
        OTHER_TRIGGER,
        PopupOptions {
            key: Some("tip".into()),
            ..instant(TriggerType::None)
        },
    );
    a.show_popup();
    h.run();
    let first = a.popup().unwrap();

    b.show_popup();
    h.run();
    let second = b.popup().unwrap();
    assert_ne!(first, second);
    assert!(a.is_opened());
    assert_eq!(h.dom().body, vec![first, second]);
    assert_eq!(h.shared.find("tip").map(|e| e.popup), Some(second));
}

#[test]
fn disconnect_tears_down_silently() {
    let mut h = Harness::new();
    let (binding, events) = h.bind(
        TRIGGER,
        PopupOptions {
            key: Some("tip".into()),
            ..hover()
        },
    );
    hover_open(&mut h, &binding);
    let seen = events.borrow().len();

    binding.disconnect();
    assert!(!binding.is_connected());
    assert!(!binding.is_opened());
    assert!(h.dom().body.is_empty());
    assert!(h.host.watchers.borrow().is_empty());
    assert_eq!(binding.listeners(), Listeners::empty());
    assert!(h.shared.find("tip").is_none());
    assert_eq!(events.borrow().len(), seen);

    // Interaction after disconnect is ignored.
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    h.advance(1000);
    assert!(!binding.is_opened());
}

#[test]
fn disconnect_during_leave_transition_removes_content() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, hover());
    hover_open(&mut h, &binding);
    binding.hide_popup();
    h.run();
    assert_eq!(h.dom().body.len(), 1);

    binding.disconnect();
    assert!(h.dom().body.is_empty());
    h.finish_leaves();
    assert!(h.dom().body.is_empty());
}

#[test]
fn shared_hand_over_during_leave_transition_replays_enter() {
    let mut h = Harness::new();
    let options = PopupOptions {
        key: Some("tip".into()),
        ..hover()
    };
    let (a, _) = h.bind(TRIGGER, options.clone());
    let (b, _) = h.bind(OTHER_TRIGGER, options);
    hover_open(&mut h, &a);
    let popup = a.popup().unwrap();

    a.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    h.advance(200);
    assert!(!a.is_opened());
    assert_eq!(h.dom().leaving.len(), 1);

    b.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    h.advance(100);
    assert!(b.is_opened());
    assert_eq!(b.popup(), Some(popup));
    assert_eq!(
        h.dom().transitions.last(),
        Some(&(popup, TransitionDirection::Enter))
    );
    assert!(h.dom().leaving.is_empty());
    assert_eq!(h.dom().body, vec![popup]);

    // A's abandoned hide never detaches B's popup.
    h.finish_leaves();
    assert_eq!(h.dom().body, vec![popup]);
    assert!(b.is_opened());
}

#[test]
fn leaving_while_show_settles_still_hides() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, hover());
    binding.handle_trigger_event(TriggerEvent::PointerEnter(Target::Trigger));
    // Show timer fires, but the show task has not run yet.
    h.host.clock.advance(Duration::from_millis(100));
    assert!(binding.is_opened());
    assert_eq!(binding.listeners(), Listeners::ENTER | Listeners::LEAVE_TRIGGER);

    binding.handle_trigger_event(TriggerEvent::PointerLeave(Target::Trigger));
    assert!(binding.state().will_hide_soon());
    h.run();
    assert!(binding.is_opened());

    h.advance(200);
    assert!(!binding.is_opened());
    h.finish_leaves();
    assert!(h.dom().body.is_empty());
    assert_eq!(binding.listeners(), Listeners::ENTER);
}

#[test]
fn reconnect_renders_fresh_content() {
    let mut h = Harness::new();
    let (binding, _) = h.bind(TRIGGER, instant(TriggerType::Click));
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();
    let first = binding.popup().unwrap();

    binding.disconnect();
    assert_eq!(binding.popup(), None);
    assert_eq!(binding.rendered(), None);

    binding.connect();
    binding.handle_trigger_event(TriggerEvent::Click);
    h.run();
    let second = binding.popup().unwrap();
    assert_ne!(first, second);
    assert_eq!(h.dom().renders, 2);
    assert_eq!(h.dom().body, vec![second]);
}
