// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by the show sequence.

use thiserror::Error;

/// Configuration errors that abort a show attempt.
///
/// Raised after the render settles and before the popup is attached, so no
/// document mutation is left behind.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum PopupError {
    /// The rendered output has no element child to use as popup root.
    #[error("popup renderer produced no element")]
    EmptyRender,

    /// The first rendered element is not a popup root.
    #[error("first rendered element is not a popup root")]
    NotPopupRoot,
}
