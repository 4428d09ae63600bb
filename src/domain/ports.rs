use crate::utils::error::Result;
use async_trait::async_trait;

/// Opaque text-completion service that turns a transcript into de-escalation tips.
#[async_trait]
pub trait TipsProvider: Send + Sync {
    async fn tips(&self, transcript: &str) -> Result<Vec<String>>;
}

/// Provider used when no external service is configured.
pub struct NoTips;

#[async_trait]
impl TipsProvider for NoTips {
    async fn tips(&self, _transcript: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}
