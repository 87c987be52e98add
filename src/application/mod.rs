pub mod refresh;

use crate::domain::error::{Result, TotpError};
use crate::domain::models::{format_code, DisplayFrame, OtpConfig};
use crate::domain::repository::SecretBackend;
use crate::domain::selection::Selection;
use crate::domain::store::SecretStore;
use crate::domain::totp::Totp;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct AppState {
    store: SecretStore,
    selection: Selection,
}

/// Owns the site mapping and the selection and is the only thing that mutates
/// them.
///
/// Lock order is `writer` then `state`. `state` is never held across backend
/// I/O, so the refresh loop is not blocked by a slow keyring write.
pub struct TOTPApplication {
    backend: Arc<dyn SecretBackend>,
    service: String,
    user: String,
    totp: Totp,
    state: Mutex<AppState>,
    writer: Mutex<()>,
}

impl TOTPApplication {
    pub fn new(
        backend: Arc<dyn SecretBackend>,
        service: impl Into<String>,
        user: impl Into<String>,
        otp: OtpConfig,
    ) -> Result<Self> {
        Ok(Self {
            backend,
            service: service.into(),
            user: user.into(),
            totp: Totp::new(otp)?,
            state: Mutex::new(AppState::default()),
            writer: Mutex::new(()),
        })
    }

    pub fn totp(&self) -> &Totp {
        &self.totp
    }

    pub async fn read_persisted(&self) -> SecretStore {
        let blob = match self.backend.get(&self.service, &self.user).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                info!("No existing sites found.");
                return SecretStore::new();
            }
            Err(e) => {
                warn!("No existing sites found: {}", e);
                return SecretStore::new();
            }
        };

        match SecretStore::from_blob(&blob) {
            Ok(store) => store,
            Err(e) => {
                error!("Sites could not be parsed: {}", e);
                SecretStore::new()
            }
        }
    }

    pub async fn load(&self) -> usize {
        let _writer = self.writer.lock().await;
        let store = self.read_persisted().await;
        let count = store.len();

        let mut state = self.state.lock().await;
        state.store = store;
        state.selection.deselect();
        info!("Loaded {} sites", count);
        count
    }

    pub async fn persist(&self, store: &SecretStore) -> Result<()> {
        let blob = store.to_blob()?;
        self.backend
            .set(&self.service, &self.user, &blob)
            .await
            .map_err(|e| {
                error!("Failed to save sites: {}", e);
                match e {
                    TotpError::PersistFailure(_) => e,
                    other => TotpError::PersistFailure(other.to_string()),
                }
            })
    }

    pub async fn add_secret(&self, site_name: &str, secret: &str) -> Result<()> {
        let _writer = self.writer.lock().await;

        let mut candidate = self.state.lock().await.store.clone();
        candidate.add(site_name, secret)?;
        self.persist(&candidate).await?;

        self.state.lock().await.store = candidate;
        info!("Added new site: {}", site_name);
        Ok(())
    }

    pub async fn delete_secret(&self, site_name: &str) -> Result<()> {
        let _writer = self.writer.lock().await;

        let mut candidate = self.state.lock().await.store.clone();
        candidate.remove(site_name)?;
        self.persist(&candidate).await?;

        let mut state = self.state.lock().await;
        state.store = candidate;
        if state.selection.is_selected(site_name) {
            state.selection.deselect();
        }
        info!("Deleted site: {}", site_name);
        Ok(())
    }

    pub async fn select(&self, site_name: &str) {
        let mut state = self.state.lock().await;
        if !state.store.contains(site_name) {
            warn!("Ignoring selection of unknown site: {}", site_name);
            return;
        }
        state.selection.select(site_name);
        debug!("Selected site: {}", site_name);
    }

    pub async fn deselect(&self) {
        self.state.lock().await.selection.deselect();
    }

    pub async fn current(&self) -> Option<String> {
        self.state
            .lock()
            .await
            .selection
            .current()
            .map(str::to_string)
    }

    pub async fn list_sites(&self) -> Vec<String> {
        self.state.lock().await.store.names()
    }

    pub async fn code_for_site(&self, site_name: &str, at: DateTime<Utc>) -> Result<String> {
        let secret = self.secret_for(site_name).await?;
        self.totp.generate_code(&secret, at)
    }

    pub async fn verify_code(&self, site_name: &str, code: &str, at: DateTime<Utc>) -> Result<bool> {
        let secret = self.secret_for(site_name).await?;
        self.totp.validate_code(&secret, code, at)
    }

    pub async fn try_frame_at(&self, at: DateTime<Utc>) -> Result<DisplayFrame> {
        let secret = {
            let state = self.state.lock().await;
            let Some(site_name) = state.selection.current() else {
                return Ok(DisplayFrame::Idle);
            };
            state
                .store
                .get(site_name)
                .map(str::to_string)
                .ok_or_else(|| TotpError::NotFound(site_name.to_string()))?
        };

        let code = self.totp.generate_code(&secret, at)?;
        Ok(DisplayFrame::Code {
            code: format_code(&code),
            fraction_elapsed: self.totp.fraction_elapsed(at),
        })
    }

    async fn secret_for(&self, site_name: &str) -> Result<String> {
        self.state
            .lock()
            .await
            .store
            .get(site_name)
            .map(str::to_string)
            .ok_or_else(|| TotpError::NotFound(site_name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::MemoryBackend;
    use chrono::TimeZone;

    const SECRET: &str = "JBSWY3DPEHPK3PXP";

    fn app_with(backend: Arc<MemoryBackend>) -> TOTPApplication {
        TOTPApplication::new(backend, "totpgen", "alice", OtpConfig::default()).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn add_persists_full_mapping() {
        let backend = Arc::new(MemoryBackend::new());
        let app = app_with(backend.clone());

        app.add_secret("Site A", SECRET).await.unwrap();
        app.add_secret("Site B", "GEZDGNBVGY3TQOJQ").await.unwrap();

        assert_eq!(backend.writes(), 2);
        let persisted = SecretStore::from_blob(&backend.blob("totpgen", "alice").unwrap()).unwrap();
        assert_eq!(persisted.names(), vec!["Site A", "Site B"]);
        assert_eq!(app.list_sites().await, vec!["Site A", "Site B"]);
    }

    #[tokio::test]
    async fn duplicate_add_does_not_write() {
        let backend = Arc::new(MemoryBackend::new());
        let app = app_with(backend.clone());
        app.add_secret("Site A", SECRET).await.unwrap();

        let err = app.add_secret("Site A", "other").await.unwrap_err();
        assert_eq!(err, TotpError::DuplicateName("Site A".to_string()));
        assert_eq!(backend.writes(), 1);
        assert_eq!(app.code_for_site("Site A", at(59)).await.unwrap(), "996554");
    }

    #[tokio::test]
    async fn persist_failure_leaves_memory_unchanged() {
        let backend = Arc::new(MemoryBackend::new());
        let app = app_with(backend.clone());
        app.add_secret("Site A", SECRET).await.unwrap();

        backend.fail_writes(true);
        assert!(matches!(
            app.add_secret("Site B", SECRET).await,
            Err(TotpError::PersistFailure(_))
        ));
        assert!(matches!(
            app.delete_secret("Site A").await,
            Err(TotpError::PersistFailure(_))
        ));
        assert_eq!(app.list_sites().await, vec!["Site A"]);
    }

    #[tokio::test]
    async fn deleting_selected_site_clears_selection() {
        let app = app_with(Arc::new(MemoryBackend::new()));
        app.add_secret("Site A", SECRET).await.unwrap();
        app.add_secret("Site B", SECRET).await.unwrap();

        app.select("Site A").await;
        app.delete_secret("Site B").await.unwrap();
        assert_eq!(app.current().await.as_deref(), Some("Site A"));

        app.delete_secret("Site A").await.unwrap();
        assert_eq!(app.current().await, None);
        assert_eq!(app.try_frame_at(at(59)).await.unwrap(), DisplayFrame::Idle);
    }

    #[tokio::test]
    async fn selecting_unknown_site_keeps_selection() {
        let app = app_with(Arc::new(MemoryBackend::new()));
        app.add_secret("Site A", SECRET).await.unwrap();

        app.select("Site B").await;
        assert_eq!(app.current().await, None);

        app.select("Site A").await;
        app.select("Site B").await;
        assert_eq!(app.current().await.as_deref(), Some("Site A"));
    }

    #[tokio::test]
    async fn delete_unknown_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let app = app_with(backend.clone());
        assert_eq!(
            app.delete_secret("nope").await,
            Err(TotpError::NotFound("nope".to_string()))
        );
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn load_tolerates_missing_and_broken_state() {
        let backend = Arc::new(MemoryBackend::new());
        let app = app_with(backend.clone());
        assert_eq!(app.load().await, 0);

        backend.set("totpgen", "alice", "not json").await.unwrap();
        assert_eq!(app.load().await, 0);

        backend.fail_reads(true);
        assert_eq!(app.load().await, 0);
        assert!(app.list_sites().await.is_empty());
    }

    #[tokio::test]
    async fn load_reads_persisted_sites() {
        let backend = Arc::new(MemoryBackend::with_blob(
            "totpgen",
            "alice",
            r#"{"CRM Production":"JBSWY3DPEHPK3PXP"}"#,
        ));
        let app = app_with(backend);
        assert_eq!(app.load().await, 1);
        assert_eq!(app.list_sites().await, vec!["CRM Production"]);
    }

    #[tokio::test]
    async fn frame_formats_selected_code() {
        let app = app_with(Arc::new(MemoryBackend::new()));
        app.add_secret("Site A", SECRET).await.unwrap();
        assert_eq!(app.try_frame_at(at(45)).await.unwrap(), DisplayFrame::Idle);

        app.select("Site A").await;
        assert_eq!(
            app.try_frame_at(at(45)).await.unwrap(),
            DisplayFrame::Code {
                code: "996 554".to_string(),
                fraction_elapsed: 0.5,
            }
        );

        app.deselect().await;
        assert_eq!(app.current().await, None);
    }

    #[tokio::test]
    async fn verify_code_uses_skew() {
        let app = app_with(Arc::new(MemoryBackend::new()));
        app.add_secret("Site A", SECRET).await.unwrap();
        assert!(app.verify_code("Site A", "996 554", at(100)).await.unwrap());
        assert!(!app.verify_code("Site A", "000000", at(45)).await.unwrap());
        assert!(matches!(
            app.verify_code("Site B", "996554", at(45)).await,
            Err(TotpError::NotFound(_))
        ));
    }
}
