use crate::config::toml_config::ServicesConfig;
use crate::domain::model::{PoolSnapshot, ServiceResource, ServiceType};
use crate::utils::error::{ConsoleError, Result};
use std::collections::BTreeMap;

/// Per-service unit bookkeeping. Only the dispatch simulator mutates it.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    services: BTreeMap<ServiceType, ServiceResource>,
}

impl ResourcePool {
    pub fn new(resources: impl IntoIterator<Item = ServiceResource>) -> Self {
        let services = resources
            .into_iter()
            .map(|resource| (resource.service, resource))
            .collect();
        Self { services }
    }

    pub fn from_config(config: &ServicesConfig) -> Self {
        Self::new(ServiceType::ALL.iter().map(|service| {
            let settings = config.get(*service);
            ServiceResource::new(*service, settings.units, settings.response_window())
        }))
    }

    /// Takes one unit. Returns the post-decrement state of that service.
    pub fn try_reserve(&mut self, service: ServiceType) -> Result<ServiceResource> {
        let resource = self.resource_mut(service)?;
        if resource.available_units == 0 {
            return Err(ConsoleError::ServiceUnavailable { service });
        }
        resource.available_units -= 1;
        Ok(resource.clone())
    }

    /// Gives one unit back. Returns false when the pool was already full.
    pub fn release(&mut self, service: ServiceType) -> Result<bool> {
        let resource = self.resource_mut(service)?;
        if resource.available_units >= resource.total_units {
            return Ok(false);
        }
        resource.available_units += 1;
        Ok(true)
    }

    pub fn get(&self, service: ServiceType) -> Option<&ServiceResource> {
        self.services.get(&service)
    }

    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            services: self.services.clone(),
        }
    }

    fn resource_mut(&mut self, service: ServiceType) -> Result<&mut ServiceResource> {
        self.services
            .get_mut(&service)
            .ok_or_else(|| ConsoleError::InvalidServiceType {
                value: service.to_string(),
            })
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::from_config(&ServicesConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ResponseWindow;
    use proptest::prelude::*;

    fn single_unit_pool() -> ResourcePool {
        ResourcePool::new([ServiceResource::new(
            ServiceType::Ems,
            1,
            ResponseWindow {
                min_minutes: 2,
                max_minutes: 4,
            },
        )])
    }

    #[test]
    fn test_reserve_decrements_and_reports_remaining() {
        let mut pool = ResourcePool::default();

        let after = pool.try_reserve(ServiceType::Police).unwrap();
        assert_eq!(after.available_units, 4);
        assert_eq!(pool.get(ServiceType::Police).unwrap().available_units, 4);
    }

    #[test]
    fn test_reserve_when_empty_is_unavailable_and_unchanged() {
        let mut pool = single_unit_pool();
        pool.try_reserve(ServiceType::Ems).unwrap();

        let err = pool.try_reserve(ServiceType::Ems).unwrap_err();
        assert!(matches!(err, ConsoleError::ServiceUnavailable { service: ServiceType::Ems }));
        assert_eq!(pool.get(ServiceType::Ems).unwrap().available_units, 0);
    }

    #[test]
    fn test_release_is_clamped_to_total() {
        let mut pool = single_unit_pool();

        assert!(!pool.release(ServiceType::Ems).unwrap());
        assert_eq!(pool.get(ServiceType::Ems).unwrap().available_units, 1);

        pool.try_reserve(ServiceType::Ems).unwrap();
        assert!(pool.release(ServiceType::Ems).unwrap());
        assert!(!pool.release(ServiceType::Ems).unwrap());
        assert_eq!(pool.get(ServiceType::Ems).unwrap().available_units, 1);
    }

    #[test]
    fn test_missing_service_is_invalid() {
        let mut pool = single_unit_pool();
        assert!(matches!(
            pool.try_reserve(ServiceType::Fire),
            Err(ConsoleError::InvalidServiceType { .. })
        ));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let mut pool = ResourcePool::default();
        let before = pool.snapshot();
        pool.try_reserve(ServiceType::Fire).unwrap();

        assert_eq!(before.get(ServiceType::Fire).unwrap().available_units, 2);
        assert_eq!(pool.snapshot().get(ServiceType::Fire).unwrap().available_units, 1);
    }

    proptest! {
        #[test]
        fn prop_available_stays_within_bounds(ops in proptest::collection::vec(any::<bool>(), 0..200)) {
            let mut pool = ResourcePool::default();
            for reserve in ops {
                if reserve {
                    let _ = pool.try_reserve(ServiceType::Ems);
                } else {
                    pool.release(ServiceType::Ems).unwrap();
                }
                let ems = pool.get(ServiceType::Ems).unwrap();
                prop_assert!(ems.available_units <= ems.total_units);
            }
        }
    }
}
