// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Delayed show/hide intent state machine.
//!
//! ## Overview
//!
//! [`PopupState`] tracks whether popup content is committed visible
//! (`opened`) plus at most one pending show and one pending hide, each backed
//! by a timer from a [`Scheduler`]. When the committed state flips it emits
//! [`StateEvent::DoShow`] or [`StateEvent::DoHide`] synchronously to its
//! subscribers, who perform the actual rendering and cleanup.
//!
//! Every entry point first cancels the opposing or duplicate timer, so a
//! pointer that re-enters before the hide delay elapses simply cancels the
//! hide, and no event is ever emitted twice for the same transition.
//!
//! ```
//! use core::time::Duration;
//! use std::rc::Rc;
//! use understory_popup::state::{Phase, PopupState};
//! use understory_popup::timer::ManualScheduler;
//!
//! let clock = Rc::new(ManualScheduler::new());
//! let state = PopupState::new(clock.clone());
//!
//! assert!(state.will_show(Duration::from_millis(100)));
//! assert_eq!(state.phase(), Phase::PendingShow);
//! // A second request while pending does not stack another timer.
//! assert!(!state.will_show(Duration::from_millis(100)));
//!
//! clock.advance(Duration::from_millis(100));
//! assert_eq!(state.phase(), Phase::Shown);
//! ```

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::emitter::{Emitter, ListenerId};
use crate::timer::{Scheduler, TimerId};

/// Committed visibility changes emitted by [`PopupState`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StateEvent {
    /// The popup became opened; render and attach it.
    DoShow,
    /// The popup became closed; detach it.
    DoHide,
}

/// Coarse state derived from the flags of a [`PopupState`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Phase {
    /// Not opened, nothing pending.
    Hidden,
    /// Not opened, a delayed show is scheduled.
    PendingShow,
    /// Opened, nothing pending.
    Shown,
    /// Opened, a delayed hide is scheduled.
    PendingHide,
}

#[derive(Debug, Default)]
struct Flags {
    opened: bool,
    show_timer: Option<TimerId>,
    hide_timer: Option<TimerId>,
}

struct Shared {
    flags: RefCell<Flags>,
    events: Emitter<StateEvent>,
    scheduler: Rc<dyn Scheduler>,
}

/// Timer-driven popup visibility state.
///
/// Cloning yields another handle to the same state.
#[derive(Clone)]
pub struct PopupState {
    shared: Rc<Shared>,
}

impl core::fmt::Debug for PopupState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PopupState")
            .field("flags", &self.shared.flags.borrow())
            .finish_non_exhaustive()
    }
}

impl PopupState {
    /// Create a hidden state whose delays run on `scheduler`.
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            shared: Rc::new(Shared {
                flags: RefCell::new(Flags::default()),
                events: Emitter::new(),
                scheduler,
            }),
        }
    }

    /// Register a listener for [`StateEvent`]s.
    pub fn subscribe(&self, listener: impl Fn(&StateEvent) + 'static) -> ListenerId {
        self.shared.events.subscribe(listener)
    }

    /// Remove a listener registered with [`subscribe`](Self::subscribe).
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.shared.events.unsubscribe(id)
    }

    /// Whether the popup is committed visible.
    pub fn opened(&self) -> bool {
        self.shared.flags.borrow().opened
    }

    /// Whether a delayed show is pending.
    pub fn will_show_soon(&self) -> bool {
        self.shared.flags.borrow().show_timer.is_some()
    }

    /// Whether a delayed hide is pending.
    pub fn will_hide_soon(&self) -> bool {
        self.shared.flags.borrow().hide_timer.is_some()
    }

    /// Current [`Phase`].
    pub fn phase(&self) -> Phase {
        let flags = self.shared.flags.borrow();
        match (flags.opened, flags.show_timer, flags.hide_timer) {
            (true, _, Some(_)) => Phase::PendingHide,
            (true, _, None) => Phase::Shown,
            (false, Some(_), _) => Phase::PendingShow,
            (false, None, _) => Phase::Hidden,
        }
    }

    /// Request a show after `delay`.
    ///
    /// Cancels a pending hide. Returns `false` when already opened or when a
    /// show is already pending. A zero delay shows immediately.
    pub fn will_show(&self, delay: Duration) -> bool {
        self.cancel_hide_timer();
        if self.opened() || self.will_show_soon() {
            return false;
        }
        if delay.is_zero() {
            self.show();
        } else {
            let weak = Rc::downgrade(&self.shared);
            let id = self.shared.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.flags.borrow_mut().show_timer = None;
                        Self { shared }.show();
                    }
                }),
            );
            self.shared.flags.borrow_mut().show_timer = Some(id);
            trace!(?delay, "show scheduled");
        }
        true
    }

    /// Cancel a pending show, if any.
    pub fn will_not_show(&self) {
        if self.cancel_show_timer() {
            trace!("pending show cancelled");
        }
    }

    /// Request a hide after `delay`.
    ///
    /// Cancels a pending show. Returns `false` when not opened or when a hide
    /// is already pending. A zero delay hides immediately.
    pub fn will_hide(&self, delay: Duration) -> bool {
        self.cancel_show_timer();
        if !self.opened() || self.will_hide_soon() {
            return false;
        }
        if delay.is_zero() {
            self.hide();
        } else {
            let weak = Rc::downgrade(&self.shared);
            let id = self.shared.scheduler.schedule(
                delay,
                Box::new(move || {
                    if let Some(shared) = weak.upgrade() {
                        shared.flags.borrow_mut().hide_timer = None;
                        Self { shared }.hide();
                    }
                }),
            );
            self.shared.flags.borrow_mut().hide_timer = Some(id);
            trace!(?delay, "hide scheduled");
        }
        true
    }

    /// Cancel a pending hide, if any.
    pub fn will_not_hide(&self) {
        if self.cancel_hide_timer() {
            trace!("pending hide cancelled");
        }
    }

    /// Show now. Emits [`StateEvent::DoShow`] only if not already opened.
    pub fn show(&self) {
        self.cancel_show_timer();
        self.cancel_hide_timer();
        if self.set_opened(true) {
            debug!("popup state opened");
            self.shared.events.emit(&StateEvent::DoShow);
        }
    }

    /// Hide now. Emits [`StateEvent::DoHide`] only if opened.
    pub fn hide(&self) {
        self.cancel_show_timer();
        self.cancel_hide_timer();
        if self.set_opened(false) {
            debug!("popup state closed");
            self.shared.events.emit(&StateEvent::DoHide);
        }
    }

    /// Cancel timers and force the closed state without emitting anything.
    ///
    /// Used for teardown.
    pub fn clear(&self) {
        self.cancel_show_timer();
        self.cancel_hide_timer();
        self.set_opened(false);
    }

    // Returns whether the flag changed.
    fn set_opened(&self, opened: bool) -> bool {
        let mut flags = self.shared.flags.borrow_mut();
        let changed = flags.opened != opened;
        flags.opened = opened;
        changed
    }

    fn cancel_show_timer(&self) -> bool {
        let id = self.shared.flags.borrow_mut().show_timer.take();
        id.map(|id| self.shared.scheduler.cancel(id)).is_some()
    }

    fn cancel_hide_timer(&self) -> bool {
        let id = self.shared.flags.borrow_mut().hide_timer.take();
        id.map(|id| self.shared.scheduler.cancel(id)).is_some()
    }
}
