use crate::core::scenario::Scenario;
use crate::core::simulation::SimCommand;
use crate::domain::model::{CallId, DispatchEvent};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Delayed work that re-enters the simulation mailbox when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerAction {
    PlaybackLine {
        call_id: CallId,
        scenario: Scenario,
        line: usize,
    },
    DispatchArrival(DispatchEvent),
}

/// One-shot timers on the runtime's task queue.
///
/// Call-scoped timers share a token per call so they can be torn down
/// together; the rest only stop at shutdown.
pub struct Scheduler {
    mailbox: mpsc::WeakSender<SimCommand>,
    shutdown: CancellationToken,
    call_timers: HashMap<CallId, CancellationToken>,
}

impl Scheduler {
    pub fn new(mailbox: mpsc::WeakSender<SimCommand>, shutdown: CancellationToken) -> Self {
        Self {
            mailbox,
            shutdown,
            call_timers: HashMap::new(),
        }
    }

    pub fn schedule_after(&self, delay: Duration, action: TimerAction) {
        self.spawn(delay, action, self.shutdown.child_token());
    }

    pub fn schedule_for_call(&mut self, call_id: &str, delay: Duration, action: TimerAction) {
        let token = self
            .call_timers
            .entry(call_id.to_string())
            .or_insert_with(|| self.shutdown.child_token())
            .clone();
        self.spawn(delay, action, token);
    }

    /// Cancels every pending timer registered for the call.
    pub fn cancel_call(&mut self, call_id: &str) -> bool {
        match self.call_timers.remove(call_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Stops tracking the call without cancelling anything still pending.
    pub fn forget_call(&mut self, call_id: &str) -> bool {
        self.call_timers.remove(call_id).is_some()
    }

    pub fn tracked_calls(&self) -> usize {
        self.call_timers.len()
    }

    fn spawn(&self, delay: Duration, action: TimerAction, token: CancellationToken) {
        let mailbox = self.mailbox.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::trace!(?action, "timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let Some(tx) = mailbox.upgrade() else {
                        return;
                    };
                    if tx.send(SimCommand::Timer(action)).await.is_err() {
                        tracing::debug!("simulation stopped before timer delivery");
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(call_id: &str, line: usize) -> TimerAction {
        TimerAction::PlaybackLine {
            call_id: call_id.to_string(),
            scenario: Scenario::Medical,
            line,
        }
    }

    async fn next_timer(rx: &mut mpsc::Receiver<SimCommand>) -> TimerAction {
        match rx.recv().await {
            Some(SimCommand::Timer(action)) => action,
            _ => panic!("expected timer"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timers_fire_in_delay_order() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = Scheduler::new(tx.downgrade(), CancellationToken::new());

        scheduler.schedule_for_call("a", Duration::from_secs(6), line("a", 1));
        scheduler.schedule_for_call("a", Duration::from_secs(3), line("a", 0));

        let start = tokio::time::Instant::now();
        assert_eq!(next_timer(&mut rx).await, line("a", 0));
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(next_timer(&mut rx).await, line("a", 1));
        assert_eq!(start.elapsed(), Duration::from_secs(6));
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_call_only_drops_that_call() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = Scheduler::new(tx.downgrade(), CancellationToken::new());

        scheduler.schedule_for_call("a", Duration::from_secs(3), line("a", 0));
        scheduler.schedule_for_call("b", Duration::from_secs(3), line("b", 0));
        assert_eq!(scheduler.tracked_calls(), 2);

        assert!(scheduler.cancel_call("a"));
        assert!(!scheduler.cancel_call("a"));

        assert_eq!(next_timer(&mut rx).await, line("b", 0));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_forget_call_keeps_pending_timers() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut scheduler = Scheduler::new(tx.downgrade(), CancellationToken::new());

        scheduler.schedule_for_call("a", Duration::from_secs(3), line("a", 0));
        assert!(scheduler.forget_call("a"));
        assert!(!scheduler.forget_call("a"));
        assert_eq!(scheduler.tracked_calls(), 0);

        assert_eq!(next_timer(&mut rx).await, line("a", 0));
        drop(tx);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_everything() {
        let (tx, mut rx) = mpsc::channel(16);
        let shutdown = CancellationToken::new();
        let mut scheduler = Scheduler::new(tx.downgrade(), shutdown.clone());

        scheduler.schedule_for_call("a", Duration::from_secs(3), line("a", 0));
        scheduler.schedule_after(Duration::from_secs(30), line("b", 0));
        shutdown.cancel();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
        drop(tx);
    }
}
