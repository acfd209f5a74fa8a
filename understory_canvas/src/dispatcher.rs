// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dispatcher helper: build a capture → bubble sequence and walk it.
//!
//! The dispatcher is deliberately minimal:
//!
//! - [`Outcome`] only controls propagation (`Continue` vs `Stop`).
//! - [`run`] reports where propagation stopped, if it did.
//! - Anything richer, such as which listeners ran, lives on the event payload
//!   passed to [`run`].
//!
//! ```
//! use understory_canvas::dispatcher::{self, Outcome};
//! use understory_canvas::Phase;
//!
//! // Capture runs outermost first, bubble runs innermost first.
//! let seq = dispatcher::sequence(&["A", "B", "shape"]);
//! let mut seen = Vec::new();
//! let stopped = dispatcher::run(&seq, &mut seen, |d, seen| {
//!     seen.push((d.phase, d.node));
//!     Outcome::Continue
//! });
//! assert!(stopped.is_none());
//! assert_eq!(seen, [
//!     (Phase::Capture, "A"), (Phase::Capture, "B"), (Phase::Capture, "shape"),
//!     (Phase::Bubble, "shape"), (Phase::Bubble, "B"), (Phase::Bubble, "A"),
//! ]);
//! ```

use alloc::vec::Vec;

use crate::event::Phase;

/// One step of a dispatch sequence.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dispatch<K> {
    /// Phase of this step.
    pub phase: Phase,
    /// Node whose listeners run.
    pub node: K,
}

impl<K> Dispatch<K> {
    /// A capture-phase step.
    pub const fn capture(node: K) -> Self {
        Self {
            phase: Phase::Capture,
            node,
        }
    }

    /// A bubble-phase step.
    pub const fn bubble(node: K) -> Self {
        Self {
            phase: Phase::Bubble,
            node,
        }
    }
}

/// Propagation control returned by a dispatch handler.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Keep going.
    Continue,
    /// Abort propagation after this step.
    Stop,
}

/// Capture over `focused` in order, then bubble over it in reverse.
pub fn sequence<K: Copy>(focused: &[K]) -> Vec<Dispatch<K>> {
    focused
        .iter()
        .map(|&node| Dispatch::capture(node))
        .chain(focused.iter().rev().map(|&node| Dispatch::bubble(node)))
        .collect()
}

/// Run a handler over a dispatch sequence and honor stop outcomes.
///
/// Returns `None` when every entry was visited, or the entry whose handler
/// returned [`Outcome::Stop`].
pub fn run<'a, K, E>(
    seq: &'a [Dispatch<K>],
    event: &mut E,
    mut handler: impl FnMut(&Dispatch<K>, &mut E) -> Outcome,
) -> Option<&'a Dispatch<K>> {
    for d in seq {
        match handler(d, event) {
            Outcome::Continue => {}
            Outcome::Stop => return Some(d),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    struct Node(u32);

    fn mk_seq() -> Vec<Dispatch<Node>> {
        sequence(&[Node(1), Node(2)])
    }

    #[test]
    fn sequence_mirrors_capture_in_bubble() {
        assert_eq!(
            mk_seq(),
            vec![
                Dispatch::capture(Node(1)),
                Dispatch::capture(Node(2)),
                Dispatch::bubble(Node(2)),
                Dispatch::bubble(Node(1)),
            ]
        );
        assert!(sequence::<Node>(&[]).is_empty());
    }

    #[test]
    fn continue_through_all() {
        let seq = mk_seq();
        let mut seen: Vec<(Phase, u32)> = Vec::new();
        let stopped = run(&seq, &mut (), |d, _| {
            seen.push((d.phase, d.node.0));
            Outcome::Continue
        });
        assert!(stopped.is_none());
        assert_eq!(seen.len(), seq.len());
    }

    #[test]
    fn stop_in_capture_skips_bubble() {
        let seq = mk_seq();
        let mut seen: Vec<(Phase, u32)> = Vec::new();
        let stopped = run(&seq, &mut (), |d, _| {
            seen.push((d.phase, d.node.0));
            if d.phase == Phase::Capture && d.node.0 == 1 {
                Outcome::Stop
            } else {
                Outcome::Continue
            }
        });
        assert_eq!(stopped, Some(&Dispatch::capture(Node(1))));
        assert_eq!(seen, vec![(Phase::Capture, 1)]);
    }

    #[test]
    fn stop_in_bubble_aborts_remaining_bubble_entries() {
        let seq = mk_seq();
        let mut seen: Vec<(Phase, u32)> = Vec::new();
        let stopped = run(&seq, &mut (), |d, _| {
            seen.push((d.phase, d.node.0));
            if d.phase == Phase::Bubble && d.node.0 == 2 {
                Outcome::Stop
            } else {
                Outcome::Continue
            }
        });
        assert_eq!(stopped, Some(&Dispatch::bubble(Node(2))));
        assert_eq!(
            seen,
            vec![(Phase::Capture, 1), (Phase::Capture, 2), (Phase::Bubble, 2)]
        );
    }
}
