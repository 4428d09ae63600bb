use crate::domain::model::{CallId, TranscriptEntry};
use std::collections::{HashMap, VecDeque};

pub const DEFAULT_MAX_ENTRIES: usize = 50;

/// Sliding-window transcript log per call.
///
/// Only calls that were opened accept appends; lines for unknown or ended
/// calls are dropped because delivery may race with call termination.
#[derive(Debug)]
pub struct TranscriptStore {
    logs: HashMap<CallId, VecDeque<TranscriptEntry>>,
    max_entries: usize,
}

impl TranscriptStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            logs: HashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Registers a call, discarding anything left over under the same id.
    pub fn open(&mut self, call_id: &str) {
        self.logs.insert(call_id.to_string(), VecDeque::new());
    }

    /// Returns false when the line was dropped.
    pub fn append(&mut self, call_id: &str, entry: TranscriptEntry) -> bool {
        let Some(log) = self.logs.get_mut(call_id) else {
            return false;
        };
        log.push_back(entry);
        while log.len() > self.max_entries {
            log.pop_front();
        }
        true
    }

    pub fn get(&self, call_id: &str) -> Vec<TranscriptEntry> {
        self.logs
            .get(call_id)
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&mut self, call_id: &str) {
        if let Some(log) = self.logs.get_mut(call_id) {
            log.clear();
        }
    }

    pub fn remove(&mut self, call_id: &str) -> bool {
        self.logs.remove(call_id).is_some()
    }

    pub fn len(&self, call_id: &str) -> usize {
        self.logs.get(call_id).map(VecDeque::len).unwrap_or(0)
    }
}

impl Default for TranscriptStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
