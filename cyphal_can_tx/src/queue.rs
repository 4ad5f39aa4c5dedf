//! Ordered transmit queue.
//!
//! The original is an intrusive `sys_slist_t` of `zyphal_tx_t` nodes, walked
//! to find an insertion point (`tx_queue_push` in `original_source/src/
//! transmit.c`). Rather than an intrusive list over borrowed transfer
//! references, this keeps a small `heapless`-backed, const-capacity,
//! insertion-sorted collection of slot indices — the same "bounded,
//! allocation-free ordered collection" shape `projectgus-fakon`'s
//! `can_queue::Tx` reaches for with its `heapless::BinaryHeap`, but stable
//! (an unstable heap would not give the FIFO tie-break required among
//! equal-priority transfers).

use crate::error::CyphalError;

#[derive(Copy, Clone)]
struct Entry {
    id: u32,
    slot: usize,
}

/// Ascending-CAN-ID ordered queue of up to `N` active transfer slots.
///
/// Ties (equal CAN-ID) preserve insertion order.
pub(crate) struct TxQueue<const N: usize> {
    entries: heapless::Vec<Entry, N>,
}

impl<const N: usize> TxQueue<N> {
    pub const fn new() -> Self {
        Self {
            entries: heapless::Vec::new(),
        }
    }

    /// Inserts `slot` (caching its CAN-ID `id`) before the first entry with
    /// a strictly greater ID; entries with an equal ID keep arrival order.
    pub fn push(&mut self, id: u32, slot: usize) -> Result<(), CyphalError> {
        self.entries
            .push(Entry { id, slot })
            .map_err(|_| CyphalError::InvalidArgument)?;

        let mut i = self.entries.len() - 1;
        while i > 0 && self.entries[i - 1].id > self.entries[i].id {
            self.entries.swap(i - 1, i);
            i -= 1;
        }
        Ok(())
    }

    /// Returns the head slot without removing it.
    pub fn peek_head(&self) -> Option<usize> {
        self.entries.first().map(|e| e.slot)
    }

    /// Detaches and returns the head slot.
    pub fn pop_head(&mut self) -> Option<usize> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0).slot)
        }
    }

    /// Removes `slot` from wherever it sits in the queue, if present.
    pub fn remove(&mut self, slot: usize) -> bool {
        match self.entries.iter().position(|e| e.slot == slot) {
            Some(pos) => {
                self.entries.remove(pos);
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_ascending_id() {
        let mut q = TxQueue::<4>::new();
        q.push(30, 0).unwrap();
        q.push(10, 1).unwrap();
        q.push(20, 2).unwrap();
        assert_eq!(q.pop_head(), Some(1));
        assert_eq!(q.pop_head(), Some(2));
        assert_eq!(q.pop_head(), Some(0));
        assert_eq!(q.pop_head(), None);
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let mut q = TxQueue::<4>::new();
        q.push(5, 0).unwrap();
        q.push(5, 1).unwrap();
        q.push(5, 2).unwrap();
        assert_eq!(q.pop_head(), Some(0));
        assert_eq!(q.pop_head(), Some(1));
        assert_eq!(q.pop_head(), Some(2));
    }

    #[test]
    fn priority_interleave_orders_by_id_not_arrival() {
        // SLOW(subject 1), FAST(subject 2), SLOW(subject 1), enqueued in that
        // order, ends up FAST, SLOW(first), SLOW(second) by ascending CAN-ID.
        let mut q = TxQueue::<4>::new();
        q.push(0x2000_0001, 0).unwrap(); // slow subject 1, first
        q.push(0x1000_0002, 1).unwrap(); // fast subject 2
        q.push(0x2000_0001, 2).unwrap(); // slow subject 1, second
        assert_eq!(q.pop_head(), Some(1));
        assert_eq!(q.pop_head(), Some(0));
        assert_eq!(q.pop_head(), Some(2));
    }

    #[test]
    fn remove_mid_queue() {
        let mut q = TxQueue::<4>::new();
        q.push(10, 0).unwrap();
        q.push(20, 1).unwrap();
        q.push(30, 2).unwrap();
        assert!(q.remove(1));
        assert!(!q.remove(1));
        assert_eq!(q.pop_head(), Some(0));
        assert_eq!(q.pop_head(), Some(2));
    }
}
