// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors surfaced by the interception layer and the collection graph.

use alloc::string::String;
use core::fmt;

/// Errors from focusing a surface, drawing through it, or editing collections.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The host has no usable 2D context, or the shadow surface could not be
    /// allocated. Raised only while focusing.
    NoRenderingContext,
    /// A lookup named a collection that was never created.
    UnknownCollection(String),
    /// Nesting would make a collection contain itself.
    CollectionCycle {
        /// Collection that would receive the member.
        parent: String,
        /// Collection that would be nested.
        child: String,
    },
    /// Identity allocation or host-interface failure.
    Pixel(understory_pixel_hit::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRenderingContext => f.write_str("surface has no usable 2D rendering context"),
            Self::UnknownCollection(name) => write!(f, "no collection named `{name}`"),
            Self::CollectionCycle { parent, child } => {
                write!(f, "nesting `{child}` in `{parent}` would create a cycle")
            }
            Self::Pixel(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl core::error::Error for Error {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Pixel(err) => Some(err),
            _ => None,
        }
    }
}

impl From<understory_pixel_hit::Error> for Error {
    fn from(err: understory_pixel_hit::Error) -> Self {
        Self::Pixel(err)
    }
}
