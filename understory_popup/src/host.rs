// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The host environment a [`PopupBinding`](crate::binding::PopupBinding) drives.
//!
//! ## Overview
//!
//! The popup core does no rendering, layout, or animation of its own. It
//! consumes them through [`Host`], whose methods are grouped by concern:
//!
//! - Rendering: [`render`](Host::render), [`rerender`](Host::rerender),
//!   [`first_element`](Host::first_element), [`until_settled`](Host::until_settled),
//!   [`is_popup_root`](Host::is_popup_root).
//! - Document: [`append_to_body`](Host::append_to_body), [`remove`](Host::remove),
//!   [`is_attached`](Host::is_attached), [`set_pointable`](Host::set_pointable),
//!   [`query`](Host::query), [`try_focus`](Host::try_focus).
//! - Geometry: [`align`](Host::align), [`viewport`](Host::viewport),
//!   [`watch_rect`](Host::watch_rect).
//! - Motion: [`transition`](Host::transition).
//! - Scheduling: [`scheduler`](Host::scheduler), [`spawn`](Host::spawn).
//!
//! Everything runs on one thread. Futures returned by the host may complete
//! at any later point of the event loop, and the binding re-checks its state
//! after every one of them.

use core::fmt::Debug;
use core::hash::Hash;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use kurbo::Rect;

use crate::options::{AlignOptions, TransitionDirection, TransitionSpec};
use crate::timer::Scheduler;

/// Function producing the popup's template each time it renders.
pub type Renderer<T> = Rc<dyn Fn() -> T>;

/// Callback receiving the new layout rect of a watched element.
pub type RectCallback = Box<dyn Fn(Rect)>;

/// Cleanup returned by [`Host::watch_rect`]; calling it stops the watch.
pub type Unwatch = Box<dyn FnOnce()>;

/// External collaborators of the popup core.
pub trait Host: 'static {
    /// Document element handle.
    type Element: Clone + Eq + Hash + Debug + 'static;
    /// Output of a [`Renderer`].
    type Template: 'static;
    /// Live render result that can be updated in place.
    type Rendered: Clone + Debug + 'static;

    /// Render a template produced by `renderer`, in the context of `trigger`.
    fn render(&self, renderer: Renderer<Self::Template>, trigger: &Self::Element) -> Self::Rendered;

    /// Update an existing render result with a new renderer.
    fn rerender(&self, rendered: &Self::Rendered, renderer: Renderer<Self::Template>);

    /// First element child of a render result.
    fn first_element(&self, rendered: &Self::Rendered) -> Option<Self::Element>;

    /// Resolves once pending renders have been applied to the document.
    fn until_settled(&self) -> LocalBoxFuture<'static, ()>;

    /// Whether `element` is the root of a popup component.
    fn is_popup_root(&self, element: &Self::Element) -> bool;

    /// Append `element` as last child of the document body, moving it if it
    /// is already attached.
    fn append_to_body(&self, element: &Self::Element);

    /// Detach `element` from the document.
    fn remove(&self, element: &Self::Element);

    /// Whether `element` is attached to the document.
    fn is_attached(&self, element: &Self::Element) -> bool;

    /// Make `element` receive pointer events or let them pass through.
    fn set_pointable(&self, element: &Self::Element, pointable: bool);

    /// Resolve `selector` relative to `trigger`.
    fn query(&self, trigger: &Self::Element, selector: &str) -> Option<Self::Element>;

    /// Focus `element` if it is focusable. Returns whether focus moved.
    fn try_focus(&self, element: &Self::Element) -> bool;

    /// Position `content` against `anchor`. Returns `false` when the anchor
    /// geometry is unusable, for example because it is detached.
    fn align(&self, content: &Self::Element, anchor: &Self::Element, options: &AlignOptions) -> bool;

    /// Current viewport rect, in the same space as watched rects.
    fn viewport(&self) -> Rect;

    /// Call `callback` whenever the layout rect of `element` changes.
    fn watch_rect(&self, element: &Self::Element, callback: RectCallback) -> Unwatch;

    /// Play a transition on `element`.
    ///
    /// Resolves to `true` if it ran to completion and `false` if it was
    /// interrupted, for example by a transition in the other direction.
    fn transition(
        &self,
        element: &Self::Element,
        spec: &TransitionSpec,
        direction: TransitionDirection,
    ) -> LocalBoxFuture<'static, bool>;

    /// Timer primitive for show and hide delays.
    fn scheduler(&self) -> Rc<dyn Scheduler>;

    /// Run `task` on the local event loop.
    fn spawn(&self, task: LocalBoxFuture<'static, ()>);
}

/// Whether `rect` overlaps `viewport` with a non-empty area.
pub fn intersects_viewport(rect: Rect, viewport: Rect) -> bool {
    let overlap = rect.intersect(viewport);
    overlap.width() > 0.0 && overlap.height() > 0.0
}
