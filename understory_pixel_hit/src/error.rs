// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors raised while minting identities or resolving host operation names.

use alloc::string::String;
use core::fmt;

/// Errors from identity allocation and host-interface lookups.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// Every colour the allocator can hand out has already been issued.
    IdentitySpaceExhausted {
        /// Number of identities issued before exhaustion.
        issued: u32,
    },
    /// The random allocator kept colliding with issued identities.
    IdentityAllocationFailed {
        /// Number of draws attempted before giving up.
        attempts: u32,
    },
    /// A name that is not an interceptable drawing or path operation.
    InvalidHookTarget(String),
    /// A name that is not a writable drawing-state property.
    UnknownStateKey(String),
    /// A colour string that could not be parsed.
    InvalidColor(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentitySpaceExhausted { issued } => {
                write!(f, "identity space exhausted after {issued} shapes")
            }
            Self::IdentityAllocationFailed { attempts } => {
                write!(f, "no unused identity found after {attempts} attempts")
            }
            Self::InvalidHookTarget(name) => {
                write!(f, "`{name}` is not an interceptable drawing operation")
            }
            Self::UnknownStateKey(name) => write!(f, "`{name}` is not a drawing-state property"),
            Self::InvalidColor(text) => write!(f, "cannot parse colour `{text}`"),
        }
    }
}

impl core::error::Error for Error {}
