//! Paged connection registry.
//!
//! Records live in fixed-capacity pages. A page is allocated with its full
//! capacity up front and never pushed past it, so its buffer is never
//! reallocated and a record never moves once appended. Index `i` lives at
//! page `i / capacity`, offset `i % capacity`.

use std::fmt;

use dispatch_core::{SlotIndex, WorkerRecord};

/// Growable, index-stable collection of worker slots.
#[derive(Debug, Clone)]
pub struct ConnectionRegistry {
    pages: Vec<Vec<WorkerRecord>>,
    page_capacity: usize,
    count: usize,
}

impl ConnectionRegistry {
    /// Create an empty registry whose pages hold `page_capacity` records.
    pub fn new(page_capacity: usize) -> Self {
        let page_capacity = page_capacity.max(1);
        Self {
            pages: vec![Vec::with_capacity(page_capacity)],
            page_capacity,
            count: 0,
        }
    }

    pub fn page_capacity(&self) -> usize {
        self.page_capacity
    }

    /// Number of slots ever appended, free ones included.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Append a record, opening a new page when the current one is full.
    pub fn append(&mut self, record: WorkerRecord) -> SlotIndex {
        let full = self
            .pages
            .last()
            .is_none_or(|page| page.len() == self.page_capacity);
        if full {
            self.pages.push(Vec::with_capacity(self.page_capacity));
        }
        if let Some(page) = self.pages.last_mut() {
            page.push(record);
        }
        self.count += 1;
        self.count - 1
    }

    pub fn at(&self, index: SlotIndex) -> Option<&WorkerRecord> {
        if index >= self.count {
            return None;
        }
        self.pages
            .get(index / self.page_capacity)?
            .get(index % self.page_capacity)
    }

    pub fn at_mut(&mut self, index: SlotIndex) -> Option<&mut WorkerRecord> {
        if index >= self.count {
            return None;
        }
        self.pages
            .get_mut(index / self.page_capacity)?
            .get_mut(index % self.page_capacity)
    }

    /// Iterate `(index, record)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &WorkerRecord)> + '_ {
        self.pages.iter().flatten().enumerate()
    }

    /// First slot not owned by a worker session.
    pub fn first_free(&self) -> Option<SlotIndex> {
        self.iter()
            .find(|(_, record)| !record.connected)
            .map(|(index, _)| index)
    }

    pub fn connected_count(&self) -> usize {
        self.iter().filter(|(_, r)| r.connected).count()
    }

    /// Highest load among connected records, `None` when nobody is connected.
    pub fn max_load(&self) -> Option<u32> {
        self.iter()
            .filter(|(_, r)| r.connected)
            .map(|(_, r)| r.load)
            .max()
    }

    /// Overwrite this registry with `other`, index by index.
    ///
    /// Existing slots are updated in place and missing ones appended, so
    /// indices already handed out keep pointing at the same slot. Slots past
    /// `other.count()` are left untouched.
    pub fn copy_from(&mut self, other: &ConnectionRegistry) {
        for (index, record) in other.iter() {
            if index >= self.count {
                self.append(record.clone());
            } else if let Some(slot) = self.at_mut(index) {
                slot.clone_from(record);
            }
        }
    }

    /// Detached copy of all records ordered by ascending load.
    ///
    /// The registry itself is never reordered; only the returned vector is.
    pub fn sorted_by_load(&self) -> Vec<WorkerRecord> {
        let mut records: Vec<WorkerRecord> = self.iter().map(|(_, r)| r.clone()).collect();
        records.sort_by_key(|r| r.load);
        records
    }
}

impl fmt::Display for ConnectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (_, record) in self.iter() {
            write!(f, "{record}")?;
        }
        f.write_str("]")
    }
}
