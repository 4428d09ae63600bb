use crate::config::toml_config::DispatchConfig;
use crate::config::NotifyMode;
use crate::core::resource_pool::ResourcePool;
use crate::core::scheduler::{Scheduler, TimerAction};
use crate::domain::model::{DispatchEvent, PoolSnapshot, ServiceType, ViewerId};
use crate::gateway::bus::EventBus;
use crate::gateway::events::{
    ArrivalStatus, Outbound, ServerEvent, ServiceDispatched, ServiceResponse, ServiceUnavailable,
};
use crate::utils::error::{ConsoleError, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Reserve-then-release simulation of emergency units.
///
/// A dispatch takes one unit from the pool right away and schedules an
/// arrival after a random delay in `[min_delay, max_delay)`. The arrival
/// gives the unit back. Arrival timers belong to the unit, not the call, so
/// ending a call never loses a release.
pub struct DispatchSimulator {
    pool: ResourcePool,
    min_delay: Duration,
    max_delay: Duration,
    notify: NotifyMode,
    rng: StdRng,
}

impl DispatchSimulator {
    pub fn new(pool: ResourcePool, config: &DispatchConfig) -> Self {
        Self {
            pool,
            min_delay: Duration::from_secs(config.min_delay_secs),
            max_delay: Duration::from_secs(config.max_delay_secs),
            notify: config.notify,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic delays for tests.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        self.pool.snapshot()
    }

    pub fn dispatch(
        &mut self,
        service: ServiceType,
        location: &str,
        requester: Option<ViewerId>,
        bus: &EventBus,
        scheduler: &Scheduler,
    ) -> Result<DispatchEvent> {
        let reserved = match self.pool.try_reserve(service) {
            Ok(reserved) => reserved,
            Err(err @ ConsoleError::ServiceUnavailable { .. }) => {
                tracing::info!("⛔ No {} units left for {}", service, location);
                bus.publish(Outbound::reply(
                    requester,
                    ServerEvent::ServiceUnavailable(ServiceUnavailable {
                        service,
                        message: "No units available".to_string(),
                    }),
                ));
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let delay = self.sample_delay();
        let dispatched_at = Utc::now();
        let event = DispatchEvent {
            service,
            location: location.to_string(),
            requester,
            dispatched_at,
            arrives_at: dispatched_at
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero()),
        };

        tracing::info!(
            "🚨 Dispatched {} to {} ({} left, arrival in {:?})",
            service,
            location,
            reserved.available_units,
            delay
        );

        bus.publish(self.notification(
            requester,
            ServerEvent::ServiceDispatched(ServiceDispatched {
                service,
                location: event.location.clone(),
                units: reserved.available_units,
                estimated_arrival: reserved.response_time.to_string(),
            }),
        ));
        bus.publish(Outbound::broadcast(ServerEvent::EmergencyServicesStatus(
            self.pool.snapshot(),
        )));

        scheduler.schedule_after(delay, TimerAction::DispatchArrival(event.clone()));
        Ok(event)
    }

    /// Timer callback: returns the unit and reports the arrival.
    pub fn arrive(&mut self, event: DispatchEvent, bus: &EventBus) -> Result<()> {
        if !self.pool.release(event.service)? {
            tracing::warn!("Duplicate release ignored for {}", event.service);
        }

        let response_time = self
            .pool
            .get(event.service)
            .map(|resource| resource.response_time.to_string())
            .unwrap_or_default();

        tracing::info!("✅ {} arrived at {}", event.service, event.location);

        bus.publish(self.notification(
            event.requester,
            ServerEvent::ServiceResponse(ServiceResponse {
                service: event.service,
                location: event.location,
                status: ArrivalStatus::Arrived,
                response_time,
            }),
        ));
        bus.publish(Outbound::broadcast(ServerEvent::EmergencyServicesStatus(
            self.pool.snapshot(),
        )));
        Ok(())
    }

    pub fn sample_delay(&mut self) -> Duration {
        let min = self.min_delay.as_millis() as u64;
        let max = self.max_delay.as_millis() as u64;
        if max <= min {
            return self.min_delay;
        }
        Duration::from_millis(self.rng.gen_range(min..max))
    }

    fn notification(&self, requester: Option<ViewerId>, event: ServerEvent) -> Outbound {
        match self.notify {
            NotifyMode::Broadcast => Outbound::broadcast(event),
            NotifyMode::Requester => Outbound::reply(requester, event),
        }
    }
}
