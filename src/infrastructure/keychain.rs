use crate::domain::error::TotpError;
use crate::domain::repository::SecretBackend;
use async_trait::async_trait;
use keyring::Entry;

#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainBackend;

impl KeychainBackend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SecretBackend for KeychainBackend {
    async fn get(&self, service: &str, user: &str) -> Result<Option<String>, TotpError> {
        let (service, user) = (service.to_string(), user.to_string());
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &user)
                .map_err(|e| TotpError::BackendUnavailable(e.to_string()))?;
            match entry.get_password() {
                Ok(blob) => Ok(Some(blob)),
                Err(keyring::Error::NoEntry) => Ok(None),
                Err(e) => Err(TotpError::BackendUnavailable(e.to_string())),
            }
        })
        .await
        .map_err(|e| TotpError::BackendUnavailable(e.to_string()))?
    }

    async fn set(&self, service: &str, user: &str, blob: &str) -> Result<(), TotpError> {
        let (service, user, blob) = (service.to_string(), user.to_string(), blob.to_string());
        tokio::task::spawn_blocking(move || {
            let entry = Entry::new(&service, &user)
                .map_err(|e| TotpError::PersistFailure(e.to_string()))?;
            entry
                .set_password(&blob)
                .map_err(|e| TotpError::PersistFailure(e.to_string()))
        })
        .await
        .map_err(|e| TotpError::PersistFailure(e.to_string()))?
    }
}
