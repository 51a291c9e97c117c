// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trigger binder: translate raw interaction events into popup intents.
//!
//! ## Overview
//!
//! [`TriggerBinder`] does not touch the document. The host forwards the
//! interaction events it observes on the trigger, on the popup, or elsewhere
//! in the document as [`TriggerEvent`]s, and the binder answers with a
//! [`Translation`]: an optional [`TriggerIntent`] plus whether the host should
//! suppress the native default action.
//!
//! Which events are meaningful depends on the [`TriggerType`] and on which
//! listeners are currently bound:
//!
//! - Enter listeners ([`Listeners::ENTER`]) are bound for as long as the
//!   binding is connected.
//! - Leave listeners are only bound while the popup is shown or about to
//!   show. [`TriggerBinder::bind_leave_before_show`] covers the trigger alone,
//!   [`TriggerBinder::bind_leave`] covers trigger and popup once the popup
//!   element exists.
//!
//! Events arriving for listeners that are not bound translate to nothing.
//!
//! ## Hover example
//!
//! ```
//! use understory_popup::binder::{Target, TriggerBinder, TriggerEvent, TriggerIntent};
//! use understory_popup::options::TriggerType;
//!
//! let mut binder = TriggerBinder::new(TriggerType::Hover);
//! binder.bind_enter();
//! let t = binder.translate(TriggerEvent::PointerEnter(Target::Trigger));
//! assert_eq!(t.intent, Some(TriggerIntent::WillShow));
//!
//! // Leaving before the popup exists only cancels the pending show.
//! binder.bind_leave_before_show();
//! let t = binder.translate(TriggerEvent::PointerLeave(Target::Trigger));
//! assert_eq!(t.intent, Some(TriggerIntent::CancelShow));
//! ```

use tracing::trace;

use crate::options::TriggerType;

/// Where an interaction event happened.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Target {
    /// The trigger element (or a descendant).
    Trigger,
    /// The popup element (or a descendant).
    Popup,
    /// Anywhere else in the document.
    Elsewhere,
}

/// Raw interaction events the host forwards to the binder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerEvent {
    /// Pointer entered the target.
    PointerEnter(Target),
    /// Pointer left the target.
    PointerLeave(Target),
    /// Pointer button pressed over the target.
    PointerDown(Target),
    /// Primary click on the trigger.
    Click,
    /// Context menu request on the trigger.
    ContextMenu,
    /// Trigger gained focus.
    Focus,
    /// Trigger lost focus.
    Blur,
}

/// Semantic requests produced by the binder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TriggerIntent {
    /// Show after the effective show delay.
    WillShow,
    /// Hide after the hide delay.
    WillHide,
    /// Drop a pending show.
    CancelShow,
    /// Hide now, skipping the delay.
    ImmediateHide,
    /// Hide if open, otherwise show.
    ToggleShowHide,
}

/// Result of [`TriggerBinder::translate`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Translation {
    /// Intent to hand to the binding, if any.
    pub intent: Option<TriggerIntent>,
    /// The host should suppress the event's default action.
    pub prevent_default: bool,
}

impl Translation {
    const NONE: Self = Self {
        intent: None,
        prevent_default: false,
    };

    fn intent(intent: TriggerIntent) -> Self {
        Self {
            intent: Some(intent),
            prevent_default: false,
        }
    }
}

bitflags::bitflags! {
    /// Listener groups currently bound by a [`TriggerBinder`].
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Listeners: u8 {
        /// Show detection on the trigger.
        const ENTER         = 0b0000_0001;
        /// Leave detection on the trigger.
        const LEAVE_TRIGGER = 0b0000_0010;
        /// Leave detection on the popup (and outside presses).
        const LEAVE_POPUP   = 0b0000_0100;
    }
}

impl Listeners {
    /// Both leave groups.
    pub const LEAVE: Self = Self::LEAVE_TRIGGER.union(Self::LEAVE_POPUP);
}

/// Translates interaction events into [`TriggerIntent`]s per [`TriggerType`].
#[derive(Clone, Debug)]
pub struct TriggerBinder {
    trigger: TriggerType,
    listeners: Listeners,
    over_trigger: bool,
    over_popup: bool,
}

impl TriggerBinder {
    /// Create an unbound binder for `trigger`.
    pub fn new(trigger: TriggerType) -> Self {
        Self {
            trigger,
            listeners: Listeners::empty(),
            over_trigger: false,
            over_popup: false,
        }
    }

    /// Trigger type fixed at construction.
    pub fn trigger(&self) -> TriggerType {
        self.trigger
    }

    /// Listener groups currently bound.
    pub fn listeners(&self) -> Listeners {
        self.listeners
    }

    /// Bind show detection. Does nothing for [`TriggerType::None`].
    pub fn bind_enter(&mut self) {
        if self.trigger != TriggerType::None {
            self.listeners |= Listeners::ENTER;
        }
    }

    /// Bind leave detection on the trigger alone, before the popup exists.
    ///
    /// Does not narrow leave detection that already covers the popup.
    pub fn bind_leave_before_show(&mut self) {
        if self.trigger != TriggerType::None && !self.listeners.contains(Listeners::LEAVE_POPUP) {
            self.listeners |= Listeners::LEAVE_TRIGGER;
        }
    }

    /// Bind leave detection covering both trigger and popup.
    pub fn bind_leave(&mut self) {
        if self.trigger != TriggerType::None {
            self.listeners |= Listeners::LEAVE;
        }
    }

    /// Drop leave detection.
    pub fn unbind_leave(&mut self) {
        self.listeners -= Listeners::LEAVE;
        self.over_popup = false;
    }

    /// Drop everything. Safe to call when nothing is bound.
    pub fn unbind(&mut self) {
        self.listeners = Listeners::empty();
        self.over_trigger = false;
        self.over_popup = false;
    }

    /// Translate one interaction event.
    pub fn translate(&mut self, event: TriggerEvent) -> Translation {
        // Containment is tracked regardless of bindings so that leave
        // detection bound later starts from the right state.
        match event {
            TriggerEvent::PointerEnter(Target::Trigger) => self.over_trigger = true,
            TriggerEvent::PointerLeave(Target::Trigger) => self.over_trigger = false,
            TriggerEvent::PointerEnter(Target::Popup) => self.over_popup = true,
            TriggerEvent::PointerLeave(Target::Popup) => self.over_popup = false,
            _ => {}
        }

        let out = match self.trigger {
            TriggerType::Hover => self.translate_hover(event),
            TriggerType::Click => self.translate_click(event, TriggerEvent::Click),
            TriggerType::ContextMenu => {
                let mut out = self.translate_click(event, TriggerEvent::ContextMenu);
                out.prevent_default = event == TriggerEvent::ContextMenu && self.enter_bound();
                out
            }
            TriggerType::Focus => self.translate_focus(event),
            TriggerType::None => Translation::NONE,
        };
        if let Some(intent) = out.intent {
            trace!(trigger = ?self.trigger, ?event, ?intent, "trigger intent");
        }
        out
    }

    fn enter_bound(&self) -> bool {
        self.listeners.contains(Listeners::ENTER)
    }

    fn translate_hover(&self, event: TriggerEvent) -> Translation {
        let leave_popup = self.listeners.contains(Listeners::LEAVE_POPUP);
        let leave_trigger = self.listeners.contains(Listeners::LEAVE_TRIGGER);
        match event {
            TriggerEvent::PointerEnter(Target::Trigger) if self.enter_bound() => {
                Translation::intent(TriggerIntent::WillShow)
            }
            // Coming back onto the popup keeps it open.
            TriggerEvent::PointerEnter(Target::Popup) if leave_popup => {
                Translation::intent(TriggerIntent::WillShow)
            }
            TriggerEvent::PointerLeave(Target::Trigger | Target::Popup) if leave_popup => {
                if self.over_trigger || self.over_popup {
                    Translation::NONE
                } else {
                    Translation::intent(TriggerIntent::WillHide)
                }
            }
            TriggerEvent::PointerLeave(Target::Trigger) if leave_trigger => {
                Translation::intent(TriggerIntent::CancelShow)
            }
            _ => Translation::NONE,
        }
    }

    fn translate_click(&self, event: TriggerEvent, activation: TriggerEvent) -> Translation {
        if event == activation && self.enter_bound() {
            return Translation::intent(TriggerIntent::ToggleShowHide);
        }
        match event {
            TriggerEvent::PointerDown(Target::Elsewhere)
                if self.listeners.contains(Listeners::LEAVE_POPUP) =>
            {
                Translation::intent(TriggerIntent::WillHide)
            }
            _ => Translation::NONE,
        }
    }

    fn translate_focus(&self, event: TriggerEvent) -> Translation {
        match event {
            TriggerEvent::Focus if self.enter_bound() => Translation::intent(TriggerIntent::WillShow),
            TriggerEvent::Blur if self.listeners.intersects(Listeners::LEAVE) => {
                Translation::intent(TriggerIntent::WillHide)
            }
            _ => Translation::NONE,
        }
    }
}
