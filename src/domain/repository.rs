use super::error::TotpError;
use async_trait::async_trait;

/// Opaque durable storage addressed by (service, user) holding a single blob.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    /// `Ok(None)` when nothing has been stored yet.
    async fn get(&self, service: &str, user: &str) -> Result<Option<String>, TotpError>;
    async fn set(&self, service: &str, user: &str, blob: &str) -> Result<(), TotpError>;
}
