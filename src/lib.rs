pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod gateway;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::{CliConfig, LogFormat};

pub use crate::adapters::GeminiTipsClient;
pub use crate::config::ConsoleConfig;
pub use crate::core::simulation::{spawn_simulation, SimulationHandle};
pub use crate::gateway::{router, serve, AppState};
pub use crate::utils::error::{ConsoleError, Result};
