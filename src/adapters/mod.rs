// Adapters layer: concrete implementations of domain ports for external systems.

pub mod gemini;

pub use gemini::GeminiTipsClient;
