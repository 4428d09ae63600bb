use crate::domain::model::{Call, CallId, CallStatus};
use crate::utils::error::{ConsoleError, Result};
use chrono::Utc;
use std::collections::HashMap;

const SIMULATED_PREFIX: &str = "sim";
const RECEIVED_PREFIX: &str = "call";

/// Active calls in creation order. `completed` is terminal: ending a call
/// removes it, so it is never queryable afterwards.
#[derive(Debug, Default)]
pub struct CallRegistry {
    calls: HashMap<CallId, Call>,
    order: Vec<CallId>,
    next_seq: u64,
}

impl CallRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an active call; its `id` is unique for the process lifetime.
    pub fn create_call(&mut self, origin: &str, destination: Option<&str>, simulated: bool) -> Call {
        let now = Utc::now();
        let prefix = if simulated { SIMULATED_PREFIX } else { RECEIVED_PREFIX };
        // 序號保證同一毫秒內也不會撞號
        let id = format!("{}_{}_{}", prefix, now.timestamp_millis(), self.next_seq);
        self.next_seq += 1;

        let call = Call {
            id: id.clone(),
            from: origin.to_string(),
            to: destination.map(str::to_string),
            start_time: now,
            status: CallStatus::Active,
            end_time: None,
            is_simulated: simulated,
        };

        self.calls.insert(id.clone(), call.clone());
        self.order.push(id);
        call
    }

    /// Marks the call completed, removes it and hands back its final record.
    pub fn end_call(&mut self, call_id: &str) -> Result<Call> {
        let mut call = self
            .calls
            .remove(call_id)
            .ok_or_else(|| ConsoleError::CallNotFound {
                call_id: call_id.to_string(),
            })?;
        self.order.retain(|id| id != call_id);

        call.status = CallStatus::Completed;
        call.end_time = Some(Utc::now());
        Ok(call)
    }

    pub fn get(&self, call_id: &str) -> Option<&Call> {
        self.calls.get(call_id)
    }

    pub fn require(&self, call_id: &str) -> Result<&Call> {
        self.get(call_id).ok_or_else(|| ConsoleError::CallNotFound {
            call_id: call_id.to_string(),
        })
    }

    pub fn list(&self) -> Vec<Call> {
        self.order
            .iter()
            .filter_map(|id| self.calls.get(id))
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.calls.len()
    }
}
