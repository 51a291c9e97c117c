// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_popup --heading-base-level=0

//! Understory Popup: the lifecycle core of tooltips, dropdowns, and context menus.
//!
//! ## Overview
//!
//! A popup is content shown near a trigger element: rendered on demand, appended to the
//! document body, positioned against an anchor, and removed again after the user moves on.
//! This crate decides *when* that happens and keeps the document consistent while it does.
//! Rendering, layout, and animation stay with the toolkit and are reached through [`Host`](crate::host::Host).
//!
//! ## Pieces
//!
//! - [`PopupState`](crate::state::PopupState): committed visibility plus at most one pending
//!   show and one pending hide, each backed by a cancellable timer.
//! - [`TriggerBinder`](crate::binder::TriggerBinder): turns pointer, click, focus, and
//!   context-menu events into show/hide intents according to a [`TriggerType`](crate::options::TriggerType).
//! - [`SharedPopups`](crate::shared::SharedPopups): bindings with the same sharing key reuse one
//!   popup, and hand it over without a show delay while it is open.
//! - [`PopupBinding`](crate::binding::PopupBinding): ties the above to one trigger and runs the
//!   show and hide sequences against the host.
//! - [`PopupOptions`](crate::options::PopupOptions): per-binding configuration, deserializable with serde.
//!
//! ## Ordering and races
//!
//! Everything is single-threaded. Timers come from a [`Scheduler`](crate::timer::Scheduler) and
//! asynchronous steps (render settling, transitions) are futures spawned on the host's local executor.
//! A hide that starts while a show is still settling, or a show that starts while the leave transition
//! is still running, supersedes the older sequence: stale sequences never touch the document.
//!
//! ## Example
//!
//! The state machine can be driven on its own with a virtual clock:
//!
//! ```
//! use core::time::Duration;
//! use std::rc::Rc;
//! use understory_popup::state::{PopupState, StateEvent};
//! use understory_popup::timer::ManualScheduler;
//!
//! let clock = Rc::new(ManualScheduler::new());
//! let state = PopupState::new(clock.clone());
//! state.subscribe(|event| {
//!     if *event == StateEvent::DoShow {
//!         // Render and attach the popup here.
//!     }
//! });
//!
//! state.will_show(Duration::from_millis(100));
//! clock.advance(Duration::from_millis(100));
//! assert!(state.opened());
//!
//! // Re-entering before the hide delay elapses keeps it open.
//! state.will_hide(Duration::from_millis(200));
//! state.will_show(Duration::from_millis(100));
//! clock.advance(Duration::from_secs(1));
//! assert!(state.opened());
//! ```
//!
//! Options come from configuration as camelCase JSON-like data, with delays in milliseconds:
//!
//! ```
//! use core::time::Duration;
//! use understory_popup::options::{PopupOptions, TriggerType};
//!
//! # fn parse(json: &str) -> PopupOptions<u32> { serde_json::from_str(json).unwrap() }
//! let options = parse(r#"{ "trigger": "click", "hideDelay": 0, "transition": null }"#);
//! assert_eq!(options.trigger, TriggerType::Click);
//! assert_eq!(options.hide_delay, Duration::ZERO);
//! assert!(options.transition.is_none());
//! ```
//!
//! Log output goes through `tracing`; install any subscriber to see it.

pub mod binder;
pub mod binding;
pub mod emitter;
pub mod error;
pub mod host;
pub mod options;
pub mod shared;
pub mod state;
pub mod timer;

pub use binding::{PopupBinding, PopupEvent};
pub use error::PopupError;
pub use options::PopupOptions;
