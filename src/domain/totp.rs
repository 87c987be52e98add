use super::error::{Result, TotpError};
use super::models::{Algorithm, OtpConfig};
use base32::Alphabet;
use chrono::{DateTime, Utc};
use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use regex::Regex;
use sha1::Sha1;
use sha2::{Sha256, Sha512};
use std::sync::LazyLock;

static BASE32_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z2-7]+$").expect("base32 pattern compiles"));

/// Canonical form of a user-supplied secret: no whitespace, upper case, no padding.
pub fn normalize_secret(secret: &str) -> String {
    secret
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_ascii_uppercase()
        .trim_end_matches('=')
        .to_string()
}

pub fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let normalized = normalize_secret(secret);

    if normalized.is_empty() {
        return Err(TotpError::InvalidSecret("secret is empty".to_string()));
    }
    if !BASE32_PATTERN.is_match(&normalized) {
        return Err(TotpError::InvalidSecret(
            "secret must only contain the characters A-Z and 2-7".to_string(),
        ));
    }
    // RFC 4648 never produces these trailing group lengths
    if matches!(normalized.len() % 8, 1 | 3 | 6) {
        return Err(TotpError::InvalidSecret(format!(
            "secret has an invalid length of {} characters",
            normalized.len()
        )));
    }

    base32::decode(Alphabet::Rfc4648 { padding: false }, &normalized)
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| TotpError::InvalidSecret("secret is not valid base32".to_string()))
}

#[derive(Debug, Clone, Copy)]
pub struct Totp {
    config: OtpConfig,
}

impl Totp {
    pub fn new(config: OtpConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn generate_code(&self, secret: &str, at: DateTime<Utc>) -> Result<String> {
        let key = decode_secret(secret)?;
        self.code_for_counter(&key, self.counter(at))
    }

    pub fn validate_code(&self, secret: &str, code: &str, at: DateTime<Utc>) -> Result<bool> {
        let key = decode_secret(secret)?;
        let code: String = code.chars().filter(|c| !c.is_whitespace()).collect();
        if code.len() != self.config.digits as usize {
            return Ok(false);
        }

        let counter = self.counter(at);
        let first = counter.saturating_sub(self.config.skew);
        let last = counter.saturating_add(self.config.skew);
        for candidate in first..=last {
            if self.code_for_counter(&key, candidate)? == code {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Time-step index for `at`. Instants before the epoch map to step 0.
    pub fn counter(&self, at: DateTime<Utc>) -> u64 {
        u64::try_from(at.timestamp()).unwrap_or(0) / self.config.period
    }

    pub fn fraction_elapsed(&self, at: DateTime<Utc>) -> f64 {
        let period = self.config.period as i64;
        let seconds = at.timestamp().rem_euclid(period) as f64;
        let subsec = f64::from(at.timestamp_subsec_nanos()) / 1_000_000_000.0;
        let fraction = (seconds + subsec) / period as f64;
        fraction.clamp(0.0, 1.0 - f64::EPSILON)
    }

    pub fn remaining_seconds(&self, at: DateTime<Utc>) -> u64 {
        let period = self.config.period as i64;
        (period - at.timestamp().rem_euclid(period)) as u64
    }

    fn code_for_counter(&self, key: &[u8], counter: u64) -> Result<String> {
        let msg = counter.to_be_bytes();
        let digest = match self.config.algorithm {
            Algorithm::Sha1 => sign::<Hmac<Sha1>>(key, &msg)?,
            Algorithm::Sha256 => sign::<Hmac<Sha256>>(key, &msg)?,
            Algorithm::Sha512 => sign::<Hmac<Sha512>>(key, &msg)?,
        };

        let offset = (digest[digest.len() - 1] & 0xf) as usize;
        let code = ((digest[offset] & 0x7f) as u64) << 24
            | (digest[offset + 1] as u64) << 16
            | (digest[offset + 2] as u64) << 8
            | (digest[offset + 3] as u64);

        let digits = self.config.digits as usize;
        let modulus = 10u64.pow(self.config.digits);
        Ok(format!("{:0digits$}", code % modulus))
    }
}

fn sign<M: Mac + KeyInit>(key: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as KeyInit>::new_from_slice(key)
        .map_err(|e| TotpError::InvalidSecret(e.to_string()))?;
    mac.update(msg);
    Ok(mac.finalize().into_bytes().to_vec())
}
