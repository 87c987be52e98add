pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::refresh::{Clock, RefreshHandle, SystemClock};
pub use application::TOTPApplication;
pub use domain::error::{Result, TotpError};
pub use domain::models::{Algorithm, DisplayFrame, OtpConfig};
pub use domain::repository::SecretBackend;
pub use domain::store::SecretStore;
pub use domain::totp::Totp;
