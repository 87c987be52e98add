use crate::domain::error::TotpError;
use crate::domain::repository::SecretBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryBackend {
    blobs: Mutex<HashMap<(String, String), String>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blob(service: &str, user: &str, blob: &str) -> Self {
        let backend = Self::new();
        if let Ok(mut blobs) = backend.blobs.lock() {
            blobs.insert((service.to_string(), user.to_string()), blob.to_string());
        }
        backend
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn blob(&self, service: &str, user: &str) -> Option<String> {
        self.blobs
            .lock()
            .ok()?
            .get(&(service.to_string(), user.to_string()))
            .cloned()
    }
}

#[async_trait]
impl SecretBackend for MemoryBackend {
    async fn get(&self, service: &str, user: &str) -> Result<Option<String>, TotpError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(TotpError::BackendUnavailable(
                "memory backend set to fail".to_string(),
            ));
        }
        let blobs = self
            .blobs
            .lock()
            .map_err(|e| TotpError::BackendUnavailable(e.to_string()))?;
        Ok(blobs.get(&(service.to_string(), user.to_string())).cloned())
    }

    async fn set(&self, service: &str, user: &str, blob: &str) -> Result<(), TotpError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(TotpError::PersistFailure(
                "memory backend set to fail".to_string(),
            ));
        }
        let mut blobs = self
            .blobs
            .lock()
            .map_err(|e| TotpError::PersistFailure(e.to_string()))?;
        blobs.insert((service.to_string(), user.to_string()), blob.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn get_and_set() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.get("svc", "alice").await.unwrap(), None);

        backend.set("svc", "alice", "{}").await.unwrap();
        assert_eq!(backend.get("svc", "alice").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(backend.get("svc", "bob").await.unwrap(), None);
        assert_eq!(backend.writes(), 1);
    }

    #[tokio::test]
    async fn injected_failures() {
        let backend = MemoryBackend::with_blob("svc", "alice", "{}");
        backend.fail_reads(true);
        assert!(matches!(
            backend.get("svc", "alice").await,
            Err(TotpError::BackendUnavailable(_))
        ));

        backend.fail_writes(true);
        assert!(matches!(
            backend.set("svc", "alice", "[]").await,
            Err(TotpError::PersistFailure(_))
        ));
        assert_eq!(backend.blob("svc", "alice").as_deref(), Some("{}"));
        assert_eq!(backend.writes(), 0);
    }
}
