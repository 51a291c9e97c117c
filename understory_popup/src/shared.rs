// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Keyed registry of popup content shared between bindings.
//!
//! ## Overview
//!
//! Bindings configured with the same sharing key render into one popup. The
//! registry maps each key to the popup root and render result that currently
//! represent it, and maps each popup root to the binding that currently
//! controls it (its *user*).
//!
//! - The registry owns the rendered content; a user is a non-owning
//!   [`Weak`] back-reference.
//! - There is at most one entry per key. The last writer for a key replaces
//!   the previous entry synchronously.
//! - When a popup changes hands through [`SharedPopups::set_user`], the
//!   previous user is told to [`release`](PopupUser::release) it.
//!
//! The registry is a cheap clonable handle. Construct one at the application
//! root and hand a clone to every binding that should share content. It is
//! single-threaded (`!Send`); all calls happen on the UI event loop.

use core::cell::RefCell;
use core::hash::Hash;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::debug;

/// What the registry needs to know about a binding that uses a popup.
pub trait PopupUser {
    /// Whether the user currently shows the popup.
    fn is_opened(&self) -> bool;

    /// Whether the user is showing the popup and refuses to give it up.
    fn keeps_visible(&self) -> bool;

    /// Another binding took the popup over; forget it without touching the
    /// document.
    ///
    /// Returns whether a leave transition was still running on the popup.
    fn release(&self) -> bool;
}

/// A registered popup and its render result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedEntry<E, R> {
    /// Popup root element.
    pub popup: E,
    /// Render result producing `popup`.
    pub rendered: R,
}

struct Registry<E, R> {
    entries: HashMap<String, SharedEntry<E, R>>,
    users: HashMap<E, Weak<dyn PopupUser>>,
}

/// Shared popup registry handle.
pub struct SharedPopups<E, R> {
    inner: Rc<RefCell<Registry<E, R>>>,
}

impl<E, R> Clone for SharedPopups<E, R> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<E, R> Default for SharedPopups<E, R> {
    fn default() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Registry {
                entries: HashMap::new(),
                users: HashMap::new(),
            })),
        }
    }
}

impl<E: core::fmt::Debug, R> core::fmt::Debug for SharedPopups<E, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("SharedPopups")
            .field("keys", &inner.entries.keys().collect::<Vec<_>>())
            .field("users", &inner.users.len())
            .finish()
    }
}

impl<E, R> SharedPopups<E, R>
where
    E: Clone + Eq + Hash + core::fmt::Debug,
    R: Clone,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with an entry.
    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Whether no key has an entry.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().entries.is_empty()
    }

    /// Entry registered for `key`.
    pub fn find(&self, key: &str) -> Option<SharedEntry<E, R>> {
        self.inner.borrow().entries.get(key).cloned()
    }

    /// Register `popup` as the content for `key`, replacing any previous entry.
    ///
    /// Returns the previous popup root when it differs from `popup` and its
    /// user no longer claims it; the caller must remove it from the document.
    pub fn add(&self, key: &str, popup: E, rendered: R) -> Option<E> {
        let previous = self.inner.borrow_mut().entries.insert(
            key.into(),
            SharedEntry {
                popup: popup.clone(),
                rendered,
            },
        );
        let previous = previous?.popup;
        if previous == popup {
            return None;
        }
        if self.is_claimed(&previous) {
            debug!(key, ?previous, "shared popup replaced, previous still claimed");
            return None;
        }
        self.inner.borrow_mut().users.remove(&previous);
        debug!(key, ?previous, "shared popup evicted");
        Some(previous)
    }

    /// Remove the entry for `key`, returning it.
    pub fn remove(&self, key: &str) -> Option<SharedEntry<E, R>> {
        let mut inner = self.inner.borrow_mut();
        let entry = inner.entries.remove(key)?;
        inner.users.remove(&entry.popup);
        Some(entry)
    }

    /// Record `user` as the controller of `popup`.
    ///
    /// A different live user that held `popup` is released. Returns whether
    /// that user was still playing a leave transition on it, in which case
    /// the new user has to play its enter transition.
    pub fn set_user(&self, popup: E, user: Weak<dyn PopupUser>) -> bool {
        let previous = self.inner.borrow_mut().users.insert(popup, user.clone());
        let Some(previous) = previous.and_then(|p| p.upgrade()) else {
            return false;
        };
        if core::ptr::addr_eq(Rc::as_ptr(&previous), Weak::as_ptr(&user)) {
            return false;
        }
        debug!("shared popup changes user");
        previous.release()
    }

    /// Forget the user of `popup`.
    pub fn clear_user(&self, popup: &E) {
        self.inner.borrow_mut().users.remove(popup);
    }

    /// Current live user of `popup`.
    pub fn user_of(&self, popup: &E) -> Option<Rc<dyn PopupUser>> {
        self.inner.borrow().users.get(popup).and_then(Weak::upgrade)
    }

    /// Whether the popup registered for `key` is currently shown by its user.
    pub fn is_cache_opened(&self, key: &str) -> bool {
        let Some(entry) = self.find(key) else {
            return false;
        };
        self.is_claimed(&entry.popup)
    }

    /// Whether the user of `popup` keeps it visible.
    pub fn is_kept_visible(&self, popup: &E) -> bool {
        self.user_of(popup).is_some_and(|u| u.keeps_visible())
    }

    fn is_claimed(&self, popup: &E) -> bool {
        self.user_of(popup).is_some_and(|u| u.is_opened())
    }
}
