//! Chronological sample chain with node recycling.
//!
//! Samples for one data key live in a doubly-linked list stored in an arena
//! (`Vec` of node slots addressed by [`NodeId`]). The live chain runs from the
//! newest sample (`next` points to older samples) to the oldest (`prev` points
//! to newer samples). Nodes trimmed from the tail are pushed onto a free list,
//! linked through `next`, and reused by [`SampleChain::prepend`] before any new
//! slot is allocated.
//!
//! ```text
//!  newest                                   oldest        free
//!    │                                        │             │
//!    ▼   next        next        next         ▼             ▼
//!  [t4] ─────▶ [t3] ─────▶ [t2] ─────▶ [t1]          [x] ─▶ [y] ─▶ ∅
//!    ◀─────       ◀─────       ◀─────
//!     prev         prev         prev
//! ```

use crate::clock::Timestamp;
use chrono::TimeDelta;

/// Index of a node slot inside a [`SampleChain`].
pub type NodeId = usize;

/// A single sample in the chain.
#[derive(Debug, Clone, Copy)]
struct SampleNode {
    timestamp: Timestamp,
    value: f64,
    /// Next newer sample.
    prev: Option<NodeId>,
    /// Next older sample (or next free slot while on the free list).
    next: Option<NodeId>,
}

/// Arena-backed chronological chain of samples plus its free list.
#[derive(Debug, Default)]
pub struct SampleChain {
    nodes: Vec<SampleNode>,
    newest: Option<NodeId>,
    oldest: Option<NodeId>,
    free: Option<NodeId>,
}

impl SampleChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Links a new sample at the head of the chain and returns its id.
    ///
    /// A node is taken from the free list when one is available; otherwise a
    /// new slot is appended to the arena.
    pub fn prepend(&mut self, timestamp: Timestamp, value: f64) -> NodeId {
        let node = SampleNode {
            timestamp,
            value,
            prev: None,
            next: self.newest,
        };

        let id = match self.free {
            Some(id) => {
                self.free = self.nodes[id].next;
                self.nodes[id] = node;
                id
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };

        if let Some(old_head) = self.newest {
            self.nodes[old_head].prev = Some(id);
        }
        self.newest = Some(id);
        if self.oldest.is_none() {
            self.oldest = Some(id);
        }

        id
    }

    /// Moves samples older than `max_period` (relative to the newest sample)
    /// onto the free list. The newest sample is never removed.
    pub fn trim(&mut self, max_period: TimeDelta) {
        let Some(newest) = self.newest else {
            return;
        };
        let newest_ts = self.nodes[newest].timestamp;

        while let Some(oldest) = self.oldest {
            let Some(newer) = self.nodes[oldest].prev else {
                break;
            };
            if newest_ts - self.nodes[oldest].timestamp <= max_period {
                break;
            }

            self.nodes[newer].next = None;
            self.nodes[oldest].prev = None;
            self.nodes[oldest].next = self.free;
            self.free = Some(oldest);
            self.oldest = Some(newer);
        }
    }

    /// Splices the whole live chain onto the free list in constant time.
    pub fn reset(&mut self) {
        if let Some(oldest) = self.oldest {
            self.nodes[oldest].next = self.free;
            self.free = self.newest;
        }
        self.newest = None;
        self.oldest = None;
    }

    /// Timestamp of the given node.
    pub fn timestamp(&self, id: NodeId) -> Timestamp {
        self.nodes[id].timestamp
    }

    /// Value of the given node.
    pub fn value(&self, id: NodeId) -> f64 {
        self.nodes[id].value
    }

    /// The next newer node, if any.
    pub fn newer(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].prev
    }

    /// Newest node in the live chain.
    pub fn newest(&self) -> Option<NodeId> {
        self.newest
    }

    /// Oldest node in the live chain.
    pub fn oldest(&self) -> Option<NodeId> {
        self.oldest
    }

    /// Number of samples in the live chain.
    pub fn len(&self) -> usize {
        Self::walk(&self.nodes, self.newest)
    }

    /// Returns true if the live chain holds no samples.
    pub fn is_empty(&self) -> bool {
        self.newest.is_none()
    }

    /// Number of recycled nodes waiting on the free list.
    pub fn free_len(&self) -> usize {
        Self::walk(&self.nodes, self.free)
    }

    /// Total number of node slots ever allocated.
    pub fn allocated(&self) -> usize {
        self.nodes.len()
    }

    /// Samples from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = (Timestamp, f64)> + '_ {
        std::iter::successors(self.newest, |&id| self.nodes[id].next)
            .map(|id| (self.nodes[id].timestamp, self.nodes[id].value))
    }

    fn walk(nodes: &[SampleNode], start: Option<NodeId>) -> usize {
        std::iter::successors(start, |&id| nodes[id].next).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(secs: i64) -> Timestamp {
        NaiveDate::from_ymd_opt(2000, 5, 15)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + TimeDelta::seconds(secs)
    }

    #[test]
    fn test_prepend_links_both_directions() {
        let mut chain = SampleChain::new();
        let a = chain.prepend(ts(0), 1.0);
        let b = chain.prepend(ts(1), 2.0);
        let c = chain.prepend(ts(2), 3.0);

        assert_eq!(chain.newest(), Some(c));
        assert_eq!(chain.oldest(), Some(a));
        assert_eq!(chain.newer(a), Some(b));
        assert_eq!(chain.newer(b), Some(c));
        assert_eq!(chain.newer(c), None);
        let values: Vec<f64> = chain.iter().map(|(_, v)| v).collect();
        assert_eq!(values, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_trim_keeps_newest_and_recycles() {
        let mut chain = SampleChain::new();
        for i in 0..5 {
            chain.prepend(ts(i), i as f64);
        }

        chain.trim(TimeDelta::seconds(2));
        assert_eq!(chain.len(), 3);
        assert_eq!(chain.free_len(), 2);
        assert_eq!(chain.timestamp(chain.oldest().unwrap()), ts(2));

        // A single sample far older than the period still survives alone.
        chain.prepend(ts(100), 9.0);
        chain.trim(TimeDelta::seconds(2));
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.free_len(), 4);
        assert_eq!(chain.newest(), chain.oldest());
    }

    #[test]
    fn test_prepend_reuses_free_nodes() {
        let mut chain = SampleChain::new();
        for i in 0..4 {
            chain.prepend(ts(i), 0.0);
        }
        chain.trim(TimeDelta::nanoseconds(1));
        assert_eq!(chain.allocated(), 4);
        assert_eq!(chain.free_len(), 3);

        for i in 4..7 {
            chain.prepend(ts(i), 0.0);
        }
        assert_eq!(chain.allocated(), 4);
        assert_eq!(chain.free_len(), 0);
        assert_eq!(chain.len(), 4);
    }

    #[test]
    fn test_reset_moves_everything_to_free_list() {
        let mut chain = SampleChain::new();
        for i in 0..3 {
            chain.prepend(ts(i), 0.0);
        }
        chain.trim(TimeDelta::nanoseconds(1));
        assert_eq!(chain.free_len(), 2);

        chain.reset();
        assert!(chain.is_empty());
        assert_eq!(chain.oldest(), None);
        assert_eq!(chain.free_len(), 3);

        chain.prepend(ts(10), 1.0);
        assert_eq!(chain.allocated(), 3);
        assert_eq!(chain.len(), 1);
    }
}
