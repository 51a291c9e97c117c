// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduled callbacks: the timer primitive consumed by [`PopupState`](crate::state::PopupState).
//!
//! ## Overview
//!
//! [`Scheduler`] is the narrow seam between the popup core and whatever event
//! loop the host runs. A scheduled callback fires at most once and can be
//! cancelled at any time before it fires.
//!
//! [`ManualScheduler`] is a deterministic implementation driven by a virtual
//! clock. Hosts that tick time from their own frame loop can use it directly,
//! and tests use it to step through delays.
//!
//! ```
//! use core::time::Duration;
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use understory_popup::timer::{ManualScheduler, Scheduler};
//!
//! let clock = ManualScheduler::new();
//! let fired = Rc::new(Cell::new(false));
//! let f = fired.clone();
//! clock.schedule(Duration::from_millis(100), Box::new(move || f.set(true)));
//!
//! clock.advance(Duration::from_millis(99));
//! assert!(!fired.get());
//! clock.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

use core::cell::{Cell, RefCell};
use core::time::Duration;

/// Identifier of a scheduled callback, unique per [`Scheduler`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// A cancellable scheduled-callback primitive.
pub trait Scheduler {
    /// Run `callback` once after `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId;

    /// Cancel a scheduled callback. Cancelling an id that already fired or
    /// was already cancelled does nothing.
    fn cancel(&self, id: TimerId);
}

struct Pending {
    id: TimerId,
    deadline: Duration,
    callback: Box<dyn FnOnce()>,
}

/// Deterministic [`Scheduler`] over a virtual clock.
///
/// Time only moves when [`advance`](Self::advance) is called. Callbacks due
/// within the advanced window fire in deadline order (ties in scheduling
/// order), and the clock reads the callback's deadline while it runs, so a
/// callback that schedules another timer measures from the right instant.
#[derive(Default)]
pub struct ManualScheduler {
    now: Cell<Duration>,
    next_id: Cell<u64>,
    pending: RefCell<Vec<Pending>>,
}

impl core::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("now", &self.now.get())
            .field("pending", &self.pending.borrow().len())
            .finish_non_exhaustive()
    }
}

impl ManualScheduler {
    /// Create a clock at time zero with nothing scheduled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Number of callbacks still waiting to fire.
    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }

    /// Move the clock forward by `by`, firing every callback that becomes due.
    ///
    /// Returns the number of callbacks fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now.get() + by;
        let mut fired = 0;
        loop {
            // Pop the earliest due entry, then release the borrow before
            // running it: callbacks routinely schedule or cancel timers.
            let next = {
                let mut pending = self.pending.borrow_mut();
                let due = pending
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| p.deadline <= target)
                    .min_by_key(|(_, p)| (p.deadline, p.id))
                    .map(|(i, _)| i);
                due.map(|i| pending.remove(i))
            };
            let Some(entry) = next else {
                break;
            };
            self.now.set(entry.deadline);
            (entry.callback)();
            fired += 1;
        }
        self.now.set(target);
        fired
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: Box<dyn FnOnce()>) -> TimerId {
        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.pending.borrow_mut().push(Pending {
            id,
            deadline: self.now.get() + delay,
            callback,
        });
        id
    }

    fn cancel(&self, id: TimerId) {
        self.pending.borrow_mut().retain(|p| p.id != id);
    }
}
