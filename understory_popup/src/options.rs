// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-binding configuration.
//!
//! [`PopupOptions`] is an immutable snapshot handed to
//! [`PopupBinding::update`](crate::binding::PopupBinding::update). Every field
//! has a default, and the struct deserializes with serde (camelCase field
//! names, delays in milliseconds), so a host can load it from JSON or TOML and
//! only spell out what differs.
//!
//! ```
//! use core::time::Duration;
//! use understory_popup::options::{PopupOptions, TriggerType};
//!
//! let options: PopupOptions<u32> = PopupOptions {
//!     trigger: TriggerType::Click,
//!     key: Some("menu".into()),
//!     ..Default::default()
//! };
//! assert_eq!(options.show_delay, Duration::from_millis(100));
//! assert!(options.pointable);
//! ```

use core::str::FromStr;
use core::time::Duration;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};

/// Which interactions open and close the popup.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// Pointer enter shows, leaving trigger and popup hides.
    #[default]
    Hover,
    /// Click toggles.
    Click,
    /// Focus shows, blur hides.
    Focus,
    /// Context menu toggles and suppresses the native menu.
    #[serde(rename = "contextmenu")]
    ContextMenu,
    /// No automatic binding; the caller drives show and hide.
    None,
}

impl TriggerType {
    /// Whether showing skips the configured show delay.
    pub fn shows_instantly(self) -> bool {
        matches!(self, Self::Click | Self::Focus | Self::ContextMenu)
    }
}

/// Error returned when parsing an unknown trigger name.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("unknown popup trigger `{0}`")]
pub struct ParseTriggerError(pub String);

impl FromStr for TriggerType {
    type Err = ParseTriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hover" => Ok(Self::Hover),
            "click" => Ok(Self::Click),
            "focus" => Ok(Self::Focus),
            "contextmenu" => Ok(Self::ContextMenu),
            "none" => Ok(Self::None),
            other => Err(ParseTriggerError(other.into())),
        }
    }
}

/// Function selecting an alignment anchor from the trigger element.
pub type AnchorFn<E> = Rc<dyn Fn(&E) -> Option<E>>;

/// Element the popup is aligned against.
///
/// A selector or function that resolves to nothing falls back to the trigger.
/// Deserializes from a selector string, or from `null` for [`AlignTo::Trigger`].
pub enum AlignTo<E> {
    /// The trigger element itself.
    Trigger,
    /// A selector resolved by [`Host::query`](crate::host::Host::query).
    Selector(String),
    /// A function of the trigger element.
    With(AnchorFn<E>),
}

impl<E> Default for AlignTo<E> {
    fn default() -> Self {
        Self::Trigger
    }
}

impl<E> Clone for AlignTo<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Trigger => Self::Trigger,
            Self::Selector(s) => Self::Selector(s.clone()),
            Self::With(f) => Self::With(f.clone()),
        }
    }
}

impl<E> core::fmt::Debug for AlignTo<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Trigger => f.write_str("Trigger"),
            Self::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
            Self::With(_) => f.write_str("With(..)"),
        }
    }
}

impl<'de, E> Deserialize<'de> for AlignTo<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<String>::deserialize(deserializer)? {
            Some(selector) => Self::Selector(selector),
            None => Self::Trigger,
        })
    }
}

/// Enter/leave animation played by [`Host::transition`](crate::host::Host::transition).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionSpec {
    /// Named effect understood by the host, such as `fade`.
    pub name: String,
    /// Duration of each direction.
    #[serde(with = "millis")]
    pub duration: Duration,
    /// Easing curve name.
    pub easing: String,
}

impl TransitionSpec {
    /// Fade with the default duration and easing.
    pub fn fade() -> Self {
        Self::default()
    }
}

impl Default for TransitionSpec {
    fn default() -> Self {
        Self {
            name: "fade".into(),
            duration: Duration::from_millis(200),
            easing: "ease-out".into(),
        }
    }
}

/// Direction of a transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransitionDirection {
    /// Popup appearing.
    Enter,
    /// Popup disappearing.
    Leave,
}

/// Alignment parameters passed to [`Host::align`](crate::host::Host::align).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AlignOptions {
    /// Relative placement code, `b` (bottom) by default.
    pub position: String,
}

/// Configuration of one [`PopupBinding`](crate::binding::PopupBinding).
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase", bound = "")]
pub struct PopupOptions<E> {
    /// Sharing key; bindings with the same key reuse one popup.
    pub key: Option<String>,
    /// Interaction that opens and closes the popup.
    pub trigger: TriggerType,
    /// Alignment anchor.
    pub align_to: AlignTo<E>,
    /// Relative placement code.
    pub align_position: String,
    /// Delay before a requested show executes.
    #[serde(with = "millis")]
    pub show_delay: Duration,
    /// Delay before a requested hide executes.
    #[serde(with = "millis")]
    pub hide_delay: Duration,
    /// Enter/leave animation; `None` disables it.
    pub transition: Option<TransitionSpec>,
    /// Show as soon as the binding connects.
    pub show_immediately: bool,
    /// Focus the popup after showing (not for hover or focus triggers).
    pub auto_focus: bool,
    /// Whether the popup receives pointer events.
    pub pointable: bool,
    /// Keep the rendered content after hiding for reuse.
    pub cacheable: bool,
    /// Suppress delayed hides until released.
    pub keep_visible: bool,
}

impl<E> Default for PopupOptions<E> {
    fn default() -> Self {
        Self {
            key: None,
            trigger: TriggerType::Hover,
            align_to: AlignTo::Trigger,
            align_position: "b".into(),
            show_delay: Duration::from_millis(100),
            hide_delay: Duration::from_millis(200),
            transition: Some(TransitionSpec::fade()),
            show_immediately: false,
            auto_focus: false,
            pointable: true,
            cacheable: false,
            keep_visible: false,
        }
    }
}

impl<E> Clone for PopupOptions<E> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            trigger: self.trigger,
            align_to: self.align_to.clone(),
            align_position: self.align_position.clone(),
            show_delay: self.show_delay,
            hide_delay: self.hide_delay,
            transition: self.transition.clone(),
            show_immediately: self.show_immediately,
            auto_focus: self.auto_focus,
            pointable: self.pointable,
            cacheable: self.cacheable,
            keep_visible: self.keep_visible,
        }
    }
}

impl<E> core::fmt::Debug for PopupOptions<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PopupOptions")
            .field("key", &self.key)
            .field("trigger", &self.trigger)
            .field("align_to", &self.align_to)
            .field("align_position", &self.align_position)
            .field("show_delay", &self.show_delay)
            .field("hide_delay", &self.hide_delay)
            .field("transition", &self.transition)
            .field("show_immediately", &self.show_immediately)
            .field("auto_focus", &self.auto_focus)
            .field("pointable", &self.pointable)
            .field("cacheable", &self.cacheable)
            .field("keep_visible", &self.keep_visible)
            .finish()
    }
}

impl<E> PopupOptions<E> {
    /// Alignment parameters derived from these options.
    pub fn align_options(&self) -> AlignOptions {
        AlignOptions {
            position: self.align_position.clone(),
        }
    }

    /// Resolve the alignment anchor for `trigger`.
    ///
    /// `query` resolves selectors. Anything that resolves to nothing falls
    /// back to the trigger element.
    pub fn resolve_anchor(&self, trigger: &E, query: impl FnOnce(&E, &str) -> Option<E>) -> E
    where
        E: Clone,
    {
        let anchor = match &self.align_to {
            AlignTo::Trigger => None,
            AlignTo::Selector(selector) => query(trigger, selector),
            AlignTo::With(f) => f(trigger),
        };
        anchor.unwrap_or_else(|| trigger.clone())
    }
}

mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
