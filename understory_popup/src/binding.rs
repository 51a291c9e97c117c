// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The popup binding: attach popup behavior to one trigger element.
//!
//! ## Overview
//!
//! [`PopupBinding`] owns a [`PopupState`] and a [`TriggerBinder`] and drives a
//! [`Host`]. Interaction events go in through
//! [`handle_trigger_event`](PopupBinding::handle_trigger_event); the binder
//! turns them into intents, the intents move the state machine, and the state
//! machine's `DoShow`/`DoHide` start the show or hide sequence.
//!
//! ## Show sequence
//!
//! 1. Resolve content: update the binding's own render result, else reuse
//!    the same-keyed shared entry (unless its user keeps it visible), else
//!    render fresh.
//! 2. Wait for the render to settle.
//! 3. Take the first element as popup root; it must be a popup root.
//! 4. Apply pointer interactivity.
//! 5. Track the popup: become its user and bind leave detection.
//! 6. Register it under the sharing key, removing evicted content.
//! 7. Append to the body, align (hiding on failure), optionally focus, watch
//!    the trigger rect, and play the enter transition if newly attached.
//!
//! ## Hide sequence
//!
//! Play the leave transition if any, then remove the popup, unbind leave
//! detection, stop watching the trigger and reset the deferred-hide flag.
//!
//! ## Races
//!
//! Both sequences run as spawned tasks and may suspend. Every state change
//! bumps an epoch; a task resuming with an outdated epoch, or finding
//! `opened` no longer matching, abandons its remaining work without touching
//! the document.

use core::cell::{Cell, RefCell};
use core::time::Duration;
use std::rc::{Rc, Weak};

use tracing::{debug, error, trace};

use crate::binder::{Listeners, TriggerBinder, TriggerEvent, TriggerIntent};
use crate::emitter::{Emitter, ListenerId};
use crate::error::PopupError;
use crate::host::{Host, Renderer, Unwatch, intersects_viewport};
use crate::options::{PopupOptions, TransitionDirection, TriggerType};
use crate::shared::{PopupUser, SharedPopups};
use crate::state::{PopupState, StateEvent};

/// Events emitted by a [`PopupBinding`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PopupEvent {
    /// The committed visibility changed.
    OpenedChange(bool),
    /// An alignment attempt is about to run.
    WillAlign,
    /// A show attempt was aborted.
    Error(PopupError),
}

/// Shared popup registry specialized to a host.
pub type HostPopups<H> = SharedPopups<<H as Host>::Element, <H as Host>::Rendered>;

/// Popup behavior attached to one trigger element.
pub struct PopupBinding<H: Host> {
    inner: Rc<Inner<H>>,
}

struct Inner<H: Host> {
    this: Weak<Self>,
    host: Rc<H>,
    trigger: H::Element,
    shared: HostPopups<H>,
    state: PopupState,
    binder: RefCell<TriggerBinder>,
    options: RefCell<PopupOptions<H::Element>>,
    renderer: RefCell<Option<Renderer<H::Template>>>,
    rendered: RefCell<Option<H::Rendered>>,
    popup: RefCell<Option<H::Element>>,
    unwatch: RefCell<Option<Unwatch>>,
    prevented_hiding: Cell<bool>,
    leaving: Cell<bool>,
    connected: Cell<bool>,
    epoch: Cell<u64>,
    events: Emitter<PopupEvent>,
}

impl<H: Host> core::fmt::Debug for PopupBinding<H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PopupBinding")
            .field("trigger", &self.inner.trigger)
            .field("state", &self.inner.state)
            .field("popup", &self.inner.popup.borrow())
            .field("connected", &self.inner.connected.get())
            .finish_non_exhaustive()
    }
}

impl<H: Host> PopupBinding<H> {
    /// Create a disconnected binding for `trigger`.
    ///
    /// Call [`update`](Self::update) to provide a renderer and options, then
    /// [`connect`](Self::connect).
    pub fn new(host: Rc<H>, trigger: H::Element, shared: HostPopups<H>) -> Self {
        let state = PopupState::new(host.scheduler());
        let inner = Rc::new_cyclic(|this| Inner {
            this: this.clone(),
            host,
            trigger,
            shared,
            state,
            binder: RefCell::new(TriggerBinder::new(TriggerType::default())),
            options: RefCell::new(PopupOptions::default()),
            renderer: RefCell::new(None),
            rendered: RefCell::new(None),
            popup: RefCell::new(None),
            unwatch: RefCell::new(None),
            prevented_hiding: Cell::new(false),
            leaving: Cell::new(false),
            connected: Cell::new(false),
            epoch: Cell::new(0),
            events: Emitter::new(),
        });
        let weak = Rc::downgrade(&inner);
        inner.state.subscribe(move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_state_event(*event);
            }
        });
        Self { inner }
    }

    /// Register a listener for [`PopupEvent`]s.
    pub fn subscribe(&self, listener: impl Fn(&PopupEvent) + 'static) -> ListenerId {
        self.inner.events.subscribe(listener)
    }

    /// Remove a listener registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.inner.events.unsubscribe(id)
    }

    /// Trigger element.
    pub fn trigger(&self) -> &H::Element {
        &self.inner.trigger
    }

    /// The state machine driving this binding.
    pub fn state(&self) -> &PopupState {
        &self.inner.state
    }

    /// Whether the popup is committed visible.
    pub fn is_opened(&self) -> bool {
        self.inner.state.opened()
    }

    /// Whether the binding is connected.
    pub fn is_connected(&self) -> bool {
        self.inner.connected.get()
    }

    /// Popup root currently tracked by this binding.
    pub fn popup(&self) -> Option<H::Element> {
        self.inner.popup.borrow().clone()
    }

    /// Render result currently held by this binding.
    pub fn rendered(&self) -> Option<H::Rendered> {
        self.inner.rendered.borrow().clone()
    }

    /// Snapshot of the current options.
    pub fn options(&self) -> PopupOptions<H::Element> {
        self.inner.options.borrow().clone()
    }

    /// Whether a delayed hide was suppressed by `keep_visible`.
    pub fn prevented_hiding(&self) -> bool {
        self.inner.prevented_hiding.get()
    }

    /// Listener groups currently bound on the trigger.
    pub fn listeners(&self) -> Listeners {
        self.inner.binder.borrow().listeners()
    }

    /// Start listening for interactions. Shows right away with
    /// `show_immediately`.
    pub fn connect(&self) {
        self.inner.connect();
    }

    /// Tear everything down without emitting events.
    pub fn disconnect(&self) {
        self.inner.disconnect();
    }

    /// Replace renderer and options.
    pub fn update(&self, renderer: Renderer<H::Template>, options: PopupOptions<H::Element>) {
        self.inner.update(renderer, options);
    }

    /// Forward an interaction event. Returns whether the host should prevent
    /// the event's default action.
    pub fn handle_trigger_event(&self, event: TriggerEvent) -> bool {
        self.inner.handle_trigger_event(event)
    }

    /// Act on an intent directly, as if the binder produced it.
    pub fn handle_intent(&self, intent: TriggerIntent) {
        self.inner.handle_intent(intent);
    }

    /// Show after the effective show delay. Returns whether a show was
    /// scheduled or executed.
    pub fn show_popup_later(&self) -> bool {
        self.inner.show_popup_later()
    }

    /// Show now.
    pub fn show_popup(&self) {
        self.inner.state.show();
    }

    /// Hide after the hide delay, unless `keep_visible` suppresses it.
    pub fn hide_popup_later(&self) -> bool {
        self.inner.hide_popup_later()
    }

    /// Hide now.
    pub fn hide_popup(&self) {
        self.inner.state.hide();
    }
}

impl<H: Host> Inner<H> {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.get() == epoch
    }

    fn bump_epoch(&self) -> u64 {
        let epoch = self.epoch.get().wrapping_add(1);
        self.epoch.set(epoch);
        epoch
    }

    fn user_handle(&self) -> Weak<dyn PopupUser> {
        self.this.clone()
    }

    fn is_user_of(&self, popup: &H::Element) -> bool {
        self.shared
            .user_of(popup)
            .is_some_and(|u| core::ptr::addr_eq(Rc::as_ptr(&u), self as *const Self))
    }

    fn connect(&self) {
        if self.connected.replace(true) {
            return;
        }
        let (trigger, show_immediately) = {
            let options = self.options.borrow();
            (options.trigger, options.show_immediately)
        };
        let mut binder = TriggerBinder::new(trigger);
        binder.bind_enter();
        *self.binder.borrow_mut() = binder;
        debug!(?trigger, "popup binding connected");
        if show_immediately {
            self.state.show();
        }
    }

    fn disconnect(&self) {
        self.bump_epoch();
        let popup = self.popup.borrow().clone();
        if let Some(popup) = &popup
            && (self.state.opened() || self.leaving.get())
        {
            self.host.remove(popup);
        }
        self.state.clear();
        self.binder.borrow_mut().unbind();
        self.stop_watching();
        self.prevented_hiding.set(false);
        self.leaving.set(false);
        let cacheable = self.options.borrow().cacheable;
        if let Some(popup) = &popup
            && self.is_user_of(popup)
        {
            self.shared.clear_user(popup);
            let key = self.options.borrow().key.clone();
            if let Some(key) = key
                && !cacheable
                && self.shared.find(&key).is_some_and(|e| e.popup == *popup)
            {
                self.shared.remove(&key);
            }
        }
        if !cacheable {
            *self.rendered.borrow_mut() = None;
            *self.popup.borrow_mut() = None;
        }
        self.connected.set(false);
        debug!("popup binding disconnected");
    }

    fn update(&self, renderer: Renderer<H::Template>, options: PopupOptions<H::Element>) {
        let keep_visible = options.keep_visible;
        *self.renderer.borrow_mut() = Some(renderer);
        *self.options.borrow_mut() = options;
        if self.state.opened() {
            self.bump_epoch();
            self.spawn_show();
        }
        if !keep_visible && self.prevented_hiding.replace(false) {
            debug!("keep_visible released, issuing deferred hide");
            self.hide_popup_later();
        }
    }

    fn handle_trigger_event(&self, event: TriggerEvent) -> bool {
        let translation = self.binder.borrow_mut().translate(event);
        if let Some(intent) = translation.intent {
            self.handle_intent(intent);
        }
        translation.prevent_default
    }

    fn handle_intent(&self, intent: TriggerIntent) {
        match intent {
            TriggerIntent::WillShow => {
                self.show_popup_later();
            }
            TriggerIntent::WillHide => {
                self.hide_popup_later();
            }
            TriggerIntent::CancelShow => {
                self.state.will_not_show();
                if self.state.opened() {
                    // Shown before leave detection covered the popup.
                    self.hide_popup_later();
                } else {
                    self.binder.borrow_mut().unbind_leave();
                }
            }
            TriggerIntent::ImmediateHide => self.state.hide(),
            TriggerIntent::ToggleShowHide => {
                if self.state.opened() {
                    self.state.hide();
                } else {
                    self.show_popup_later();
                }
            }
        }
    }

    fn show_delay(&self) -> Duration {
        let options = self.options.borrow();
        let shared_open = options
            .key
            .as_deref()
            .is_some_and(|key| self.shared.is_cache_opened(key));
        if shared_open || options.trigger.shows_instantly() {
            Duration::ZERO
        } else {
            options.show_delay
        }
    }

    fn show_popup_later(&self) -> bool {
        let delay = self.show_delay();
        let scheduled = self.state.will_show(delay);
        if scheduled {
            self.binder.borrow_mut().bind_leave_before_show();
        }
        scheduled
    }

    fn hide_popup_later(&self) -> bool {
        let (keep_visible, delay) = {
            let options = self.options.borrow();
            (options.keep_visible, options.hide_delay)
        };
        if keep_visible {
            trace!("hide deferred by keep_visible");
            self.prevented_hiding.set(true);
            return false;
        }
        self.state.will_hide(delay)
    }

    fn on_state_event(&self, event: StateEvent) {
        self.bump_epoch();
        match event {
            StateEvent::DoShow => {
                self.spawn_show();
                self.events.emit(&PopupEvent::OpenedChange(true));
            }
            StateEvent::DoHide => {
                self.spawn_hide();
                self.events.emit(&PopupEvent::OpenedChange(false));
            }
        }
    }

    fn spawn_show(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let epoch = self.epoch.get();
        self.host.spawn(Box::pin(async move {
            if let Err(err) = this.show_sequence(epoch).await {
                error!(%err, "popup show aborted");
                this.events.emit(&PopupEvent::Error(err));
                if this.is_current(epoch) {
                    this.state.hide();
                }
            }
        }));
    }

    fn spawn_hide(&self) {
        let Some(this) = self.this.upgrade() else {
            return;
        };
        let epoch = self.epoch.get();
        self.host.spawn(Box::pin(async move {
            this.hide_sequence(epoch).await;
        }));
    }

    fn render_popup(&self) -> Option<H::Rendered> {
        let Some(renderer) = self.renderer.borrow().clone() else {
            debug!("popup has no renderer yet");
            return None;
        };
        let own = self.rendered.borrow().clone();
        if let Some(rendered) = own {
            self.host.rerender(&rendered, renderer);
            return Some(rendered);
        }
        let key = self.options.borrow().key.clone();
        let cached = key
            .as_deref()
            .and_then(|key| self.shared.find(key))
            .filter(|entry| !self.shared.is_kept_visible(&entry.popup));
        let rendered = match cached {
            Some(entry) => {
                debug!(?key, "reusing shared popup content");
                self.host.rerender(&entry.rendered, renderer);
                entry.rendered
            }
            None => self.host.render(renderer, &self.trigger),
        };
        *self.rendered.borrow_mut() = Some(rendered.clone());
        Some(rendered)
    }

    async fn show_sequence(&self, epoch: u64) -> Result<(), PopupError> {
        if !self.is_current(epoch) || !self.state.opened() {
            return Ok(());
        }
        let Some(rendered) = self.render_popup() else {
            return Ok(());
        };

        self.host.until_settled().await;
        if !self.is_current(epoch) || !self.state.opened() {
            trace!("stale popup show abandoned");
            return Ok(());
        }

        let popup = self
            .host
            .first_element(&rendered)
            .ok_or(PopupError::EmptyRender)?;
        if !self.host.is_popup_root(&popup) {
            return Err(PopupError::NotPopupRoot);
        }
        let options = self.options.borrow().clone();
        self.host.set_pointable(&popup, options.pointable);

        let tracked = self.popup.borrow().clone();
        if tracked.as_ref() != Some(&popup) {
            debug!(?popup, "tracking popup root");
            *self.popup.borrow_mut() = Some(popup.clone());
        }
        let took_over_leaving = self.shared.set_user(popup.clone(), self.user_handle());
        self.binder.borrow_mut().bind_leave();

        if let Some(key) = &options.key
            && let Some(evicted) = self.shared.add(key, popup.clone(), rendered)
        {
            self.host.remove(&evicted);
        }

        let newly_attached =
            !self.host.is_attached(&popup) || self.leaving.get() || took_over_leaving;
        self.host.append_to_body(&popup);
        if !self.align(&popup) {
            debug!(?popup, "popup alignment failed, hiding");
            self.state.hide();
            return Ok(());
        }
        if options.auto_focus && !matches!(options.trigger, TriggerType::Hover | TriggerType::Focus) {
            self.host.try_focus(&popup);
        }
        self.watch_trigger();

        if newly_attached && let Some(spec) = &options.transition {
            self.leaving.set(false);
            let finished = self
                .host
                .transition(&popup, spec, TransitionDirection::Enter)
                .await;
            trace!(finished, "popup enter transition settled");
        }
        Ok(())
    }

    async fn hide_sequence(&self, epoch: u64) {
        if !self.is_current(epoch) || self.state.opened() {
            return;
        }
        let popup = self.popup.borrow().clone();
        if let Some(popup) = &popup {
            let transition = self.options.borrow().transition.clone();
            if let Some(spec) = transition.filter(|_| self.host.is_attached(popup)) {
                self.leaving.set(true);
                let finished = self
                    .host
                    .transition(popup, &spec, TransitionDirection::Leave)
                    .await;
                if !self.is_current(epoch) || self.state.opened() {
                    trace!(finished, "popup hide superseded during leave transition");
                    return;
                }
                self.leaving.set(false);
            }
            self.host.remove(popup);
        }
        self.finish_hide();
    }

    fn finish_hide(&self) {
        self.binder.borrow_mut().unbind_leave();
        self.stop_watching();
        self.prevented_hiding.set(false);
        let popup = self.popup.borrow().clone();
        if let Some(popup) = &popup
            && self.is_user_of(popup)
        {
            self.shared.clear_user(popup);
        }
        if !self.options.borrow().cacheable {
            *self.rendered.borrow_mut() = None;
            *self.popup.borrow_mut() = None;
        }
    }

    fn align(&self, popup: &H::Element) -> bool {
        self.events.emit(&PopupEvent::WillAlign);
        let options = self.options.borrow().clone();
        let anchor = options.resolve_anchor(&self.trigger, |trigger, selector| {
            self.host.query(trigger, selector)
        });
        self.host.align(popup, &anchor, &options.align_options())
    }

    fn watch_trigger(&self) {
        if self.unwatch.borrow().is_some() {
            return;
        }
        let weak = self.this.clone();
        let unwatch = self.host.watch_rect(
            &self.trigger,
            Box::new(move |rect| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_trigger_rect(rect);
                }
            }),
        );
        *self.unwatch.borrow_mut() = Some(unwatch);
    }

    fn stop_watching(&self) {
        let unwatch = self.unwatch.borrow_mut().take();
        if let Some(unwatch) = unwatch {
            unwatch();
        }
    }

    fn on_trigger_rect(&self, rect: kurbo::Rect) {
        if !self.state.opened() {
            return;
        }
        if !intersects_viewport(rect, self.host.viewport()) {
            debug!(?rect, "trigger left the viewport, hiding popup");
            self.handle_intent(TriggerIntent::ImmediateHide);
            return;
        }
        let popup = self.popup.borrow().clone();
        if let Some(popup) = popup
            && !self.align(&popup)
        {
            debug!(?popup, "popup realignment failed, hiding");
            self.state.hide();
        }
    }
}

impl<H: Host> PopupUser for Inner<H> {
    fn is_opened(&self) -> bool {
        self.state.opened()
    }

    fn keeps_visible(&self) -> bool {
        self.state.opened() && self.options.borrow().keep_visible
    }

    fn release(&self) -> bool {
        debug!("popup taken over by another binding");
        self.bump_epoch();
        let was_opened = self.state.opened();
        let was_leaving = self.leaving.get();
        self.state.clear();
        self.binder.borrow_mut().unbind_leave();
        self.stop_watching();
        self.prevented_hiding.set(false);
        self.leaving.set(false);
        *self.popup.borrow_mut() = None;
        *self.rendered.borrow_mut() = None;
        if was_opened {
            self.events.emit(&PopupEvent::OpenedChange(false));
        }
        was_leaving
    }
}

#[cfg(test)]
mod tests;
