//! Recency Cache
//!
//! Process-local bounded FIFO of the most recent non-permanent records.
//! Strict insertion order; on overflow the oldest entry is evicted with no
//! further persistence. Consumers must not assume durability.

use chrono::Utc;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::model::{MemoryRecord, RecencySlot};

// ============================================================================
// RECENCY CACHE
// ============================================================================

/// Bounded FIFO keyed by record id, guarded by a single mutex
pub struct RecencyCache {
    capacity: usize,
    slots: Mutex<VecDeque<RecencySlot>>,
}

impl RecencyCache {
    /// Create a cache with the given capacity; 0 disables it
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            slots: Mutex::new(VecDeque::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append a record; returns `false` when the cache is disabled.
    /// Evicts the oldest entries once the capacity is exceeded.
    pub fn append(&self, record: &MemoryRecord) -> bool {
        if self.capacity == 0 {
            return false;
        }

        let slot = RecencySlot {
            record_id: record.id,
            category: record.category,
            topic: record.topic.clone(),
            content: record.content.clone(),
            inserted_at: Utc::now(),
        };

        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.push_back(slot);
        while slots.len() > self.capacity {
            slots.pop_front();
        }
        true
    }

    /// Current entries, newest first
    pub fn dump(&self) -> Vec<RecencySlot> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// TESTS
// ============================================================================
