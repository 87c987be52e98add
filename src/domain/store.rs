use super::error::{Result, TotpError};
use super::totp::{decode_secret, normalize_secret};
use std::collections::BTreeMap;
use tracing::warn;

/// Site name -> base32 secret. Names are unique; secrets are validated on entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretStore {
    sites: BTreeMap<String, String>,
}

impl SecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, site_name: &str, secret: &str) -> Result<()> {
        let site_name = validate_site_name(site_name)?;
        if self.sites.contains_key(site_name) {
            return Err(TotpError::DuplicateName(site_name.to_string()));
        }
        decode_secret(secret)?;

        self.sites
            .insert(site_name.to_string(), normalize_secret(secret));
        Ok(())
    }

    pub fn remove(&mut self, site_name: &str) -> Result<String> {
        self.sites
            .remove(site_name)
            .ok_or_else(|| TotpError::NotFound(site_name.to_string()))
    }

    pub fn get(&self, site_name: &str) -> Option<&str> {
        self.sites.get(site_name).map(String::as_str)
    }

    pub fn contains(&self, site_name: &str) -> bool {
        self.sites.contains_key(site_name)
    }

    pub fn names(&self) -> Vec<String> {
        self.sites.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn to_blob(&self) -> Result<String> {
        serde_json::to_string(&self.sites).map_err(|e| TotpError::PersistFailure(e.to_string()))
    }

    /// Secrets are kept exactly as stored. Entries whose name `add` would
    /// reject are skipped.
    pub fn from_blob(blob: &str) -> std::result::Result<Self, serde_json::Error> {
        let sites: BTreeMap<String, String> = serde_json::from_str(blob)?;
        Ok(Self {
            sites: sites
                .into_iter()
                .filter(|(name, _)| match validate_site_name(name) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!("Skipping stored site {:?}: {}", name, e);
                        false
                    }
                })
                .collect(),
        })
    }
}

fn validate_site_name(site_name: &str) -> Result<&str> {
    if site_name.trim().is_empty() {
        return Err(TotpError::InvalidName("site name cannot be empty".to_string()));
    }
    if site_name.chars().any(char::is_control) {
        return Err(TotpError::InvalidName(
            "site name cannot contain control characters".to_string(),
        ));
    }
    Ok(site_name)
}
