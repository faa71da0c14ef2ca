use fleet_core::ids::InvocationId;
use fleet_core::invocation::CompletionRecord;
use indexmap::IndexMap;

/// Completed records in completion order, bounded to `capacity` entries.
///
/// Inserting past capacity evicts the oldest completions first. Eviction is
/// final: evicted records are dropped, not archived.
#[derive(Debug)]
pub struct CompletedHistory {
    records: IndexMap<InvocationId, CompletionRecord>,
    capacity: usize,
}

impl CompletedHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: IndexMap::with_capacity(capacity.saturating_add(1)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Admit a record as the newest completion and prune to capacity.
    ///
    /// A record for an id already present replaces the old one and moves to
    /// the newest position. Returns the ids evicted by pruning, oldest first.
    pub fn insert(&mut self, record: CompletionRecord) -> Vec<InvocationId> {
        let _ = self.records.shift_remove(&record.id);
        let _ = self.records.insert(record.id.clone(), record);
        self.prune()
    }

    fn prune(&mut self) -> Vec<InvocationId> {
        let excess = self.records.len().saturating_sub(self.capacity);
        self.records
            .drain(..excess)
            .map(|(id, _)| id)
            .collect()
    }

    pub fn get(&self, id: &InvocationId) -> Option<&CompletionRecord> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &InvocationId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The last `limit` ids, oldest first.
    pub fn recent_ids(&self, limit: usize) -> Vec<InvocationId> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.keys().skip(skip).cloned().collect()
    }

    /// The last `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<CompletionRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.values().skip(skip).cloned().collect()
    }
}
