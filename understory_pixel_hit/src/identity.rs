// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identity colours and the allocator that mints them.
//!
//! Every logical shape gets one [`IdentityColor`]. The shadow surface paints the
//! shape with that colour, so reading a pixel back yields the shape that produced it.
//!
//! Two strategies are available through [`IdentityStrategy`]:
//!
//! - [`IdentityStrategy::Sequential`] (default): a counter written as three base-255
//!   digits. Never repeats; fails with [`Error::IdentitySpaceExhausted`] after
//!   [`SEQUENTIAL_CAPACITY`] identities.
//! - [`IdentityStrategy::Random`]: seeded uniform bytes, checked against every issued
//!   identity and redrawn on collision. Fails with [`Error::IdentityAllocationFailed`]
//!   once the retry budget is spent.
//!
//! ```
//! use understory_pixel_hit::{IdentityAllocator, IdentityColor};
//!
//! let mut ids = IdentityAllocator::default();
//! assert_eq!(ids.allocate().unwrap(), IdentityColor::new(0, 0, 0));
//! assert_eq!(ids.allocate().unwrap(), IdentityColor::new(0, 0, 1));
//! assert_eq!(ids.issued(), 2);
//! ```

use core::fmt;
use core::str::FromStr;

use hashbrown::HashSet;
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::error::Error;
use crate::state::Color;

/// Digit base of the sequential strategy. Channel value 255 is never produced.
const BASE: u32 = 255;

/// Number of identities the sequential strategy can issue (255³).
pub const SEQUENTIAL_CAPACITY: u32 = BASE * BASE * BASE;

/// Number of distinct RGB triples (256³), the ceiling of the random strategy.
pub const RANDOM_CAPACITY: u32 = 1 << 24;

/// The flat colour assigned to exactly one shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityColor {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl IdentityColor {
    /// Create an identity from its channels.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// The opaque colour used to paint this identity.
    pub const fn to_color(self) -> Color {
        Color::rgb(self.r, self.g, self.b)
    }

    /// Interpret a sampled pixel. Only fully opaque pixels carry an identity.
    pub const fn from_pixel(pixel: Color) -> Option<Self> {
        if pixel.a == 255 {
            Some(Self::new(pixel.r, pixel.g, pixel.b))
        } else {
            None
        }
    }
}

/// Textual key form, `r-g-b`.
impl fmt::Display for IdentityColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.r, self.g, self.b)
    }
}

impl FromStr for IdentityColor {
    type Err = core::num::ParseIntError;

    /// Parse the `r-g-b` key form produced by [`Display`](fmt::Display).
    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let mut parts = key.splitn(3, '-');
        let mut channel = || parts.next().unwrap_or("").trim().parse::<u8>();
        Ok(Self::new(channel()?, channel()?, channel()?))
    }
}

/// How an [`IdentityAllocator`] picks colours.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IdentityStrategy {
    /// Counter split into three base-255 digits.
    #[default]
    Sequential,
    /// Seeded uniform bytes with collision checks.
    Random {
        /// Seed for the generator; equal seeds produce equal identity sequences.
        seed: u64,
        /// Redraws allowed after a colliding draw before giving up.
        max_retries: u32,
    },
}

impl IdentityStrategy {
    /// Random strategy with a default retry budget.
    pub const fn random(seed: u64) -> Self {
        Self::Random {
            seed,
            max_retries: 16,
        }
    }
}

enum State {
    Sequential {
        next: u32,
    },
    Random {
        rng: SmallRng,
        issued: HashSet<IdentityColor>,
        max_retries: u32,
    },
}

/// Per-context source of unique identity colours.
///
/// An identity returned by [`IdentityAllocator::allocate`] is reserved for the lifetime
/// of the allocator and never handed out again.
pub struct IdentityAllocator {
    state: State,
}

impl fmt::Debug for IdentityAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let strategy = match self.state {
            State::Sequential { .. } => "sequential",
            State::Random { .. } => "random",
        };
        f.debug_struct("IdentityAllocator")
            .field("strategy", &strategy)
            .field("issued", &self.issued())
            .finish_non_exhaustive()
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new(IdentityStrategy::default())
    }
}

impl IdentityAllocator {
    /// Create an allocator using `strategy`.
    pub fn new(strategy: IdentityStrategy) -> Self {
        let state = match strategy {
            IdentityStrategy::Sequential => State::Sequential { next: 0 },
            IdentityStrategy::Random { seed, max_retries } => State::Random {
                rng: SmallRng::seed_from_u64(seed),
                issued: HashSet::new(),
                max_retries,
            },
        };
        Self { state }
    }

    /// Sequential allocator that continues after `issued` identities.
    ///
    /// Identities below `issued` are treated as already handed out.
    pub fn resume_sequential(issued: u32) -> Self {
        Self {
            state: State::Sequential {
                next: issued.min(SEQUENTIAL_CAPACITY),
            },
        }
    }

    /// Number of identities issued so far.
    pub fn issued(&self) -> u32 {
        match &self.state {
            State::Sequential { next } => *next,
            #[allow(
                clippy::cast_possible_truncation,
                reason = "The issued set never exceeds RANDOM_CAPACITY, which fits in u32."
            )]
            State::Random { issued, .. } => issued.len() as u32,
        }
    }

    /// Total number of identities this allocator can ever issue.
    pub fn capacity(&self) -> u32 {
        match self.state {
            State::Sequential { .. } => SEQUENTIAL_CAPACITY,
            State::Random { .. } => RANDOM_CAPACITY,
        }
    }

    /// Mint a previously unused identity.
    pub fn allocate(&mut self) -> Result<IdentityColor, Error> {
        match &mut self.state {
            State::Sequential { next } => {
                if *next >= SEQUENTIAL_CAPACITY {
                    return Err(Error::IdentitySpaceExhausted { issued: *next });
                }
                let id = sequential_identity(*next);
                *next += 1;
                Ok(id)
            }
            State::Random {
                rng,
                issued,
                max_retries,
            } => {
                #[allow(
                    clippy::cast_possible_truncation,
                    reason = "The issued set never exceeds RANDOM_CAPACITY, which fits in u32."
                )]
                let count = issued.len() as u32;
                if count >= RANDOM_CAPACITY {
                    return Err(Error::IdentitySpaceExhausted { issued: count });
                }
                let attempts = max_retries.saturating_add(1);
                for _ in 0..attempts {
                    let mut rgb = [0_u8; 3];
                    rng.fill_bytes(&mut rgb);
                    let id = IdentityColor::new(rgb[0], rgb[1], rgb[2]);
                    if issued.insert(id) {
                        return Ok(id);
                    }
                }
                Err(Error::IdentityAllocationFailed { attempts })
            }
        }
    }
}

/// Split `n` into three base-255 digits, most significant first.
fn sequential_identity(n: u32) -> IdentityColor {
    let high = BASE * BASE;
    let r = n / high;
    let g = (n - r * high) / BASE;
    let b = n - r * high - g * BASE;
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Each digit is below BASE, so it fits in u8."
    )]
    IdentityColor::new(r as u8, g as u8, b as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn sequential_digits() {
        assert_eq!(sequential_identity(0), IdentityColor::new(0, 0, 0));
        assert_eq!(sequential_identity(254), IdentityColor::new(0, 0, 254));
        assert_eq!(sequential_identity(255), IdentityColor::new(0, 1, 0));
        assert_eq!(sequential_identity(255 * 255), IdentityColor::new(1, 0, 0));
        assert_eq!(
            sequential_identity(SEQUENTIAL_CAPACITY - 1),
            IdentityColor::new(254, 254, 254)
        );
    }

    #[test]
    fn sequential_identities_are_unique() {
        let mut ids = IdentityAllocator::default();
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            assert!(seen.insert(ids.allocate().unwrap()), "identity was reissued");
        }
        assert_eq!(ids.issued(), 2000);
    }

    #[test]
    fn sequential_exhaustion_fails_loudly() {
        let mut ids = IdentityAllocator::resume_sequential(SEQUENTIAL_CAPACITY - 1);
        assert_eq!(ids.allocate().unwrap(), IdentityColor::new(254, 254, 254));
        assert_eq!(
            ids.allocate(),
            Err(Error::IdentitySpaceExhausted {
                issued: SEQUENTIAL_CAPACITY
            })
        );
        // Still exhausted; the counter does not wrap.
        assert!(ids.allocate().is_err());
    }

    #[test]
    fn random_identities_are_unique_and_seeded() {
        let mut a = IdentityAllocator::new(IdentityStrategy::random(7));
        let mut b = IdentityAllocator::new(IdentityStrategy::random(7));
        let mut seen = HashSet::new();
        for _ in 0..2000 {
            let id = a.allocate().unwrap();
            assert_eq!(id, b.allocate().unwrap());
            assert!(seen.insert(id), "identity was reissued");
        }
        assert_eq!(a.capacity(), RANDOM_CAPACITY);
    }

    #[test]
    fn random_collision_exhausts_retry_budget() {
        let seed = 42;
        let mut probe = SmallRng::seed_from_u64(seed);
        let mut rgb = [0_u8; 3];
        probe.fill_bytes(&mut rgb);
        let first = IdentityColor::new(rgb[0], rgb[1], rgb[2]);

        let mut ids = IdentityAllocator::new(IdentityStrategy::Random {
            seed,
            max_retries: 0,
        });
        if let State::Random { issued, .. } = &mut ids.state {
            issued.insert(first);
        }
        assert_eq!(
            ids.allocate(),
            Err(Error::IdentityAllocationFailed { attempts: 1 })
        );
    }

    #[test]
    fn key_round_trip() {
        let id = IdentityColor::new(3, 250, 17);
        assert_eq!(id.to_string(), "3-250-17");
        assert_eq!("3-250-17".parse::<IdentityColor>().unwrap(), id);
        assert!("3-250".parse::<IdentityColor>().is_err());
    }

    #[test]
    fn only_opaque_pixels_carry_identity() {
        assert_eq!(
            IdentityColor::from_pixel(Color::rgb(1, 2, 3)),
            Some(IdentityColor::new(1, 2, 3))
        );
        assert_eq!(IdentityColor::from_pixel(Color::TRANSPARENT), None);
    }
}
