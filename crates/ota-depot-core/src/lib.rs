//! Core of the OTA depot: firmware families, version ordering and the
//! resolver that picks the newest image for a device.

pub mod error;
pub mod resolver;
pub mod types;
pub mod version;

pub use error::{OtaError, Result};
pub use resolver::{FirmwareResolver, select_latest};
pub use types::*;
pub use version::FirmwareVersion;
