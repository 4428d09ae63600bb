// Gateway layer: where viewer commands enter and simulation events leave.

pub mod bus;
pub mod events;
pub mod http;
pub mod ws;

pub use bus::EventBus;
pub use http::{router, serve, AppState};
