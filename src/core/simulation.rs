//! The single owner of all mutable call/dispatch state.
//!
//! Everything that changes a call, a transcript or the unit pool goes through
//! one mailbox and is applied by one task, one command at a time:
//!
//! ```text
//!  viewer frames ─┐
//!  HTTP queries ──┼──► mpsc mailbox ──► Simulation::handle ──► EventBus ──► viewers
//!  timers ────────┘          ▲                  │
//!                            └──── Scheduler ◄──┘
//! ```
//!
//! Timers never touch state themselves; when they fire they post a
//! [`SimCommand::Timer`] back into the mailbox.

use crate::config::ConsoleConfig;
use crate::core::dispatch::DispatchSimulator;
use crate::core::lifecycle::LifecycleController;
use crate::core::resource_pool::ResourcePool;
use crate::core::scheduler::{Scheduler, TimerAction};
use crate::domain::model::{Call, CallId, PoolSnapshot, ServiceType, TranscriptEntry, ViewerId};
use crate::gateway::bus::EventBus;
use crate::gateway::events::{
    Action, CommandRejected, OperatorAction, Outbound, ServerEvent, SimulateCall, ViewerCommand,
};
use crate::utils::error::{ConsoleError, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const MAILBOX_CAPACITY: usize = 256;

pub enum SimCommand {
    Viewer {
        viewer: Option<ViewerId>,
        command: ViewerCommand,
    },
    ReceiveCall {
        from: String,
        to: Option<String>,
        reply: oneshot::Sender<Call>,
    },
    ListCalls(oneshot::Sender<Vec<Call>>),
    Transcript {
        call_id: CallId,
        reply: oneshot::Sender<Vec<TranscriptEntry>>,
    },
    Snapshot(oneshot::Sender<PoolSnapshot>),
    Timer(TimerAction),
}

pub struct Simulation {
    lifecycle: LifecycleController,
    dispatcher: DispatchSimulator,
    scheduler: Scheduler,
    bus: EventBus,
}

impl Simulation {
    pub fn new(config: &ConsoleConfig, bus: EventBus, scheduler: Scheduler) -> Self {
        Self {
            lifecycle: LifecycleController::new(config),
            dispatcher: DispatchSimulator::new(
                ResourcePool::from_config(&config.services),
                &config.dispatch,
            ),
            scheduler,
            bus,
        }
    }

    pub async fn run(mut self, mut mailbox: mpsc::Receiver<SimCommand>, shutdown: CancellationToken) {
        tracing::info!("🟢 Simulation started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                command = mailbox.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }
        tracing::info!("🔴 Simulation stopped");
    }

    pub fn handle(&mut self, command: SimCommand) {
        match command {
            SimCommand::Viewer { viewer, command } => self.handle_viewer(viewer, command),
            SimCommand::ReceiveCall { from, to, reply } => {
                let call = self.lifecycle.receive_call(&from, to.as_deref(), &self.bus);
                let _ = reply.send(call);
            }
            SimCommand::ListCalls(reply) => {
                let _ = reply.send(self.lifecycle.calls());
            }
            SimCommand::Transcript { call_id, reply } => {
                let _ = reply.send(self.lifecycle.transcript(&call_id));
            }
            SimCommand::Snapshot(reply) => {
                let _ = reply.send(self.dispatcher.snapshot());
            }
            SimCommand::Timer(action) => self.handle_timer(action),
        }
    }

    fn handle_viewer(&mut self, viewer: Option<ViewerId>, command: ViewerCommand) {
        match command {
            ViewerCommand::OperatorAction(action) => {
                let label = action.action_type.clone();
                if let Err(err) = self.operator_action(viewer, action) {
                    self.report(viewer, &label, err);
                }
            }
            ViewerCommand::SimulateCall(SimulateCall {
                phone_number,
                scenario,
            }) => {
                self.lifecycle.simulate_call(
                    phone_number.as_deref(),
                    scenario.as_deref(),
                    &self.bus,
                    &mut self.scheduler,
                );
            }
            ViewerCommand::TranscriptUpdate(update) => {
                self.lifecycle.record_transcript(update.into_entry(), &self.bus);
            }
        }
    }

    fn operator_action(&mut self, viewer: Option<ViewerId>, action: OperatorAction) -> Result<()> {
        tracing::debug!(?viewer, "👮 Operator action: {}", action.action_type);
        match action.into_action()? {
            Action::Dispatch { service, location } => self.dispatch(viewer, service, &location),
            Action::Escalate { call_id } => self.lifecycle.escalate(&call_id, &self.bus),
            Action::Transfer {
                call_id,
                department,
            } => self.lifecycle.transfer(&call_id, department, &self.bus),
            Action::End { call_id } => self
                .lifecycle
                .end(&call_id, &self.bus, &mut self.scheduler)
                .map(|_| ()),
        }
    }

    fn dispatch(&mut self, viewer: Option<ViewerId>, service: ServiceType, location: &str) -> Result<()> {
        self.dispatcher
            .dispatch(service, location, viewer, &self.bus, &self.scheduler)
            .map(|_| ())
    }

    fn handle_timer(&mut self, action: TimerAction) {
        let result = match action {
            TimerAction::PlaybackLine {
                call_id,
                scenario,
                line,
            } => {
                // 最後一句播完後不再需要這通電話的計時器
                if line + 1 >= scenario.script().len() {
                    self.scheduler.forget_call(&call_id);
                }
                self.lifecycle.play_line(&call_id, scenario, line, &self.bus)
            }
            TimerAction::DispatchArrival(event) => self.dispatcher.arrive(event, &self.bus),
        };
        if let Err(err) = result {
            self.report(None, "timer", err);
        }
    }

    /// Logs a failed command. Protocol errors are also sent back to the requester.
    fn report(&self, viewer: Option<ViewerId>, command: &str, err: ConsoleError) {
        match &err {
            _ if err.is_expected() => {
                tracing::info!("{} not completed: {}", command, err);
            }
            ConsoleError::UnknownCommand { .. } => {
                tracing::warn!("Unknown operator action ignored: {}", command);
            }
            ConsoleError::InvalidServiceType { .. } | ConsoleError::MissingField { .. } => {
                tracing::warn!("Rejected {}: {}", command, err);
                self.bus.publish(Outbound::reply(
                    viewer,
                    ServerEvent::CommandRejected(CommandRejected {
                        command: command.to_string(),
                        reason: err.user_friendly_message(),
                    }),
                ));
            }
            _ => {
                tracing::error!("{} failed: {} (severity {:?})", command, err, err.severity());
            }
        }
    }
}

/// Cloneable front door to the running simulation.
#[derive(Clone)]
pub struct SimulationHandle {
    tx: mpsc::Sender<SimCommand>,
    bus: EventBus,
}

impl SimulationHandle {
    pub async fn submit(&self, viewer: Option<ViewerId>, command: ViewerCommand) -> Result<()> {
        self.send(SimCommand::Viewer { viewer, command }).await
    }

    pub async fn simulate_call(&self, phone_number: Option<&str>, scenario: &str) -> Result<()> {
        self.submit(
            None,
            ViewerCommand::SimulateCall(SimulateCall {
                phone_number: phone_number.map(str::to_string),
                scenario: Some(scenario.to_string()),
            }),
        )
        .await
    }

    pub async fn operator_action(&self, viewer: Option<ViewerId>, action: OperatorAction) -> Result<()> {
        self.submit(viewer, ViewerCommand::OperatorAction(action)).await
    }

    pub async fn receive_call(&self, from: &str, to: Option<&str>) -> Result<Call> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::ReceiveCall {
            from: from.to_string(),
            to: to.map(str::to_string),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ConsoleError::SimulationClosed)
    }

    pub async fn list_calls(&self) -> Result<Vec<Call>> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::ListCalls(reply)).await?;
        rx.await.map_err(|_| ConsoleError::SimulationClosed)
    }

    pub async fn transcript(&self, call_id: &str) -> Result<Vec<TranscriptEntry>> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::Transcript {
            call_id: call_id.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ConsoleError::SimulationClosed)
    }

    pub async fn snapshot(&self) -> Result<PoolSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(SimCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| ConsoleError::SimulationClosed)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    async fn send(&self, command: SimCommand) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| ConsoleError::SimulationClosed)
    }
}

/// Starts the simulation task. Cancelling `shutdown` stops it and every pending timer.
///
/// ```
/// # tokio_test::block_on(async {
/// use dispatch_console::{spawn_simulation, ConsoleConfig};
/// use tokio_util::sync::CancellationToken;
///
/// let shutdown = CancellationToken::new();
/// let (sim, task) = spawn_simulation(&ConsoleConfig::default(), shutdown.clone());
///
/// let call = sim.receive_call("+15550001234", None).await.unwrap();
/// assert_eq!(sim.list_calls().await.unwrap()[0].id, call.id);
///
/// shutdown.cancel();
/// task.await.unwrap();
/// # });
/// ```
pub fn spawn_simulation(
    config: &ConsoleConfig,
    shutdown: CancellationToken,
) -> (SimulationHandle, JoinHandle<()>) {
    let (tx, mailbox) = mpsc::channel(MAILBOX_CAPACITY);
    let bus = EventBus::default();
    let scheduler = Scheduler::new(tx.downgrade(), shutdown.clone());
    let simulation = Simulation::new(config, bus.clone(), scheduler);

    let task = tokio::spawn(simulation.run(mailbox, shutdown));
    (SimulationHandle { tx, bus }, task)
}
