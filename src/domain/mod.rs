// Domain layer: call/dispatch models and ports (interfaces). No runtime dependencies beyond serde/chrono.

pub mod model;
pub mod ports;
