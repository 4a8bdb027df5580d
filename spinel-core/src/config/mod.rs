//! Channel configuration
//!
//! Startup configuration table, stored as postcard binary data when
//! persisted.

pub mod types;

pub use types::*;

/// Configuration loading errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Deserialization failed
    Deserialize,
    /// Config version mismatch
    VersionMismatch { found: u8 },
}

#[cfg(feature = "serde")]
impl From<postcard::Error> for ConfigError {
    fn from(_: postcard::Error) -> Self {
        ConfigError::Deserialize
    }
}

#[cfg(feature = "serde")]
impl ConfigTable {
    /// Decode a persisted table
    pub fn from_postcard(bytes: &[u8]) -> Result<Self, ConfigError> {
        let table: ConfigTable = postcard::from_bytes(bytes)?;

        if table.version != CONFIG_VERSION {
            warn!(
                "Config version mismatch: found {}, expected {}",
                table.version,
                CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch {
                found: table.version,
            });
        }

        Ok(table)
    }

    /// Encode this table into `buf`, returning the used prefix
    pub fn to_postcard<'b>(&self, buf: &'b mut [u8]) -> Result<&'b mut [u8], postcard::Error> {
        postcard::to_slice(self, buf)
    }
}
