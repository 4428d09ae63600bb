use crate::config::ConsoleConfig;
use crate::core::analysis;
use crate::core::call_registry::CallRegistry;
use crate::core::scenario::Scenario;
use crate::core::scheduler::{Scheduler, TimerAction};
use crate::core::transcript_store::TranscriptStore;
use crate::domain::model::{Call, CallId, TranscriptEntry};
use crate::gateway::bus::EventBus;
use crate::gateway::events::{
    CallRef, CallTransferred, NewCall, Outbound, ServerEvent, DEFAULT_PHONE_NUMBER,
};
use crate::utils::error::Result;
use std::time::Duration;

const CALLER: &str = "Caller";

/// Call creation, scripted playback, escalation, transfer and termination.
pub struct LifecycleController {
    registry: CallRegistry,
    transcripts: TranscriptStore,
    playback_interval: Duration,
    default_scenario: Scenario,
    phone_number: Option<String>,
}

impl LifecycleController {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            registry: CallRegistry::new(),
            transcripts: TranscriptStore::new(config.transcript.max_entries),
            playback_interval: config.playback.interval(),
            default_scenario: config.default_scenario(),
            phone_number: config.console.phone_number.clone(),
        }
    }

    /// Starts a scripted call: one caller line per playback tick, in order.
    pub fn simulate_call(
        &mut self,
        phone_number: Option<&str>,
        scenario: Option<&str>,
        bus: &EventBus,
        scheduler: &mut Scheduler,
    ) -> CallId {
        let from = phone_number
            .map(str::trim)
            .filter(|number| !number.is_empty())
            .unwrap_or(DEFAULT_PHONE_NUMBER);
        let scenario = Scenario::resolve(scenario, self.default_scenario);

        let to = self.phone_number.clone();
        let call = self.open_call(from, to.as_deref(), true, bus);
        tracing::info!("📞 Simulating {} call {} from {}", scenario, call.id, from);

        for line in 0..scenario.script().len() {
            scheduler.schedule_for_call(
                &call.id,
                self.playback_interval * (line as u32 + 1),
                TimerAction::PlaybackLine {
                    call_id: call.id.clone(),
                    scenario,
                    line,
                },
            );
        }

        call.id
    }

    /// Registers a call that arrived from outside the simulator.
    pub fn receive_call(&mut self, from: &str, to: Option<&str>, bus: &EventBus) -> Call {
        let to = to.map(str::to_string).or_else(|| self.phone_number.clone());
        let call = self.open_call(from, to.as_deref(), false, bus);
        tracing::info!("📞 Received call {} from {}", call.id, from);
        call
    }

    /// Timer callback for one scripted line.
    pub fn play_line(&mut self, call_id: &str, scenario: Scenario, line: usize, bus: &EventBus) -> Result<()> {
        self.registry.require(call_id)?;
        let Some(text) = scenario.script().get(line) else {
            return Ok(());
        };
        self.append_and_publish(TranscriptEntry::new(call_id, CALLER, *text), bus);
        Ok(())
    }

    /// Ingress for externally supplied lines. Returns false when the line was dropped.
    pub fn record_transcript(&mut self, entry: TranscriptEntry, bus: &EventBus) -> bool {
        self.append_and_publish(entry, bus)
    }

    pub fn escalate(&self, call_id: &str, bus: &EventBus) -> Result<()> {
        self.registry.require(call_id)?;
        tracing::info!("🚨 Escalating call {}", call_id);
        bus.publish(Outbound::broadcast(ServerEvent::CallEscalated(CallRef {
            call_id: call_id.to_string(),
        })));
        Ok(())
    }

    pub fn transfer(&self, call_id: &str, department: Option<String>, bus: &EventBus) -> Result<()> {
        self.registry.require(call_id)?;
        tracing::info!(
            "🔄 Transferring call {} to {}",
            call_id,
            department.as_deref().unwrap_or("unspecified department")
        );
        bus.publish(Outbound::broadcast(ServerEvent::CallTransferred(CallTransferred {
            call_id: call_id.to_string(),
            department,
        })));
        Ok(())
    }

    /// Completes the call, drops its transcript and tears down its playback timers.
    pub fn end(&mut self, call_id: &str, bus: &EventBus, scheduler: &mut Scheduler) -> Result<Call> {
        let call = self.registry.end_call(call_id)?;
        self.transcripts.remove(call_id);
        scheduler.cancel_call(call_id);

        tracing::info!("📴 Ended call {}", call_id);
        bus.publish(Outbound::broadcast(ServerEvent::CallEnded(CallRef {
            call_id: call_id.to_string(),
        })));
        Ok(call)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.registry.list()
    }

    pub fn transcript(&self, call_id: &str) -> Vec<TranscriptEntry> {
        self.transcripts.get(call_id)
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    fn open_call(&mut self, from: &str, to: Option<&str>, simulated: bool, bus: &EventBus) -> Call {
        let call = self.registry.create_call(from, to, simulated);
        // 清掉同一 id 殘留的逐字稿
        self.transcripts.open(&call.id);

        bus.publish(Outbound::broadcast(ServerEvent::NewCall(NewCall {
            call_id: call.id.clone(),
            from: call.from.clone(),
            to: call.to.clone(),
            start_time: call.start_time,
            is_simulated: simulated,
        })));
        call
    }

    fn append_and_publish(&mut self, entry: TranscriptEntry, bus: &EventBus) -> bool {
        let call_id = entry.call_id.clone();
        if !self.transcripts.append(&call_id, entry.clone()) {
            tracing::debug!("Dropped transcript line for unknown call {}", call_id);
            return false;
        }

        bus.publish(Outbound::broadcast(ServerEvent::TranscriptUpdated(entry)));
        if let Some(analysis) = analysis::analyze(&call_id, &self.transcripts.get(&call_id)) {
            bus.publish(Outbound::broadcast(ServerEvent::CallAnalysis(analysis)));
        }
        true
    }
}
