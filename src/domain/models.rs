use super::error::{Result, TotpError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl FromStr for Algorithm {
    type Err = TotpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().replace('-', "").as_str() {
            "SHA1" => Ok(Algorithm::Sha1),
            "SHA256" => Ok(Algorithm::Sha256),
            "SHA512" => Ok(Algorithm::Sha512),
            _ => Err(TotpError::UnsupportedAlgorithm(s.to_string())),
        }
    }
}

impl TryFrom<String> for Algorithm {
    type Error = TotpError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Algorithm> for String {
    fn from(value: Algorithm) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    pub algorithm: Algorithm,
    pub digits: u32,
    pub period: u64,
    pub skew: u64,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Sha1,
            digits: 6,
            period: 30,
            skew: 2,
        }
    }
}

impl OtpConfig {
    pub const MAX_DIGITS: u32 = 10;

    pub fn validate(&self) -> Result<()> {
        if self.digits == 0 || self.digits > Self::MAX_DIGITS {
            return Err(TotpError::InvalidConfig(format!(
                "digits must be between 1 and {}, got {}",
                Self::MAX_DIGITS,
                self.digits
            )));
        }
        if self.period == 0 {
            return Err(TotpError::InvalidConfig(
                "period must be at least one second".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayFrame {
    Idle,
    Code { code: String, fraction_elapsed: f64 },
    Error { fraction_elapsed: f64 },
}

impl DisplayFrame {
    pub const ERROR_TEXT: &'static str = "Error";

    pub fn text(&self) -> &str {
        match self {
            DisplayFrame::Idle => "",
            DisplayFrame::Code { code, .. } => code,
            DisplayFrame::Error { .. } => Self::ERROR_TEXT,
        }
    }

    pub fn fraction_elapsed(&self) -> Option<f64> {
        match self {
            DisplayFrame::Idle => None,
            DisplayFrame::Code {
                fraction_elapsed, ..
            }
            | DisplayFrame::Error { fraction_elapsed } => Some(*fraction_elapsed),
        }
    }

    pub fn fraction_remaining(&self) -> Option<f64> {
        self.fraction_elapsed().map(|f| 1.0 - f)
    }
}

/// Splits a code at its midpoint with a single space: "123456" -> "123 456".
pub fn format_code(code: &str) -> String {
    let mid = code.len() / 2;
    if mid == 0 {
        return code.to_string();
    }
    format!("{} {}", &code[..mid], &code[mid..])
}
