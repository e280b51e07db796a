//! Bitstream profile
//!
//! Header strings and the handful of device constants written into the
//! command preamble. Every field defaults to the reference stream, so an
//! empty profile reproduces it byte-for-byte.
//!
//! ```toml
//! part = "xczu7ev-ffvc1156-2-e"
//! idcode = 0x04a5a093
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while loading a profile
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading the profile
    #[error("I/O error: {0}")]
    Io(String),

    /// TOML parsing error
    #[error("Failed to parse profile: {0}")]
    Parse(String),
}

/// Header and preamble settings for generated bitstreams
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BitstreamProfile {
    /// Design name field ('a')
    pub design: String,
    /// Part name field ('b')
    pub part: String,
    /// Date field ('c')
    pub date: String,
    /// Time field ('d')
    pub time: String,
    /// Value of the data length field ('e')
    pub declared_length: u32,
    /// Device IDCODE
    pub idcode: u32,
    /// Configuration options register 0
    pub cor0: u32,
    /// Configuration options register 1
    pub cor1: u32,
    /// NOPs after the final DESYNC
    pub trailing_nops: usize,
}

impl Default for BitstreamProfile {
    fn default() -> Self {
        Self {
            design: "top;UserID=0XFFFFFFFF;Version=2019.1".to_string(),
            part: "xczu7ev-ffvc1156-2-e".to_string(),
            date: "2019/09/08".to_string(),
            time: "00:00:00".to_string(),
            declared_length: 0x0136_6FB0,
            idcode: 0x04A5_A093,
            cor0: 0x3800_3FE5,
            cor1: 0x0040_0000,
            trailing_nops: 400,
        }
    }
}

impl BitstreamProfile {
    /// Load a profile from a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&contents)
    }

    /// Parse a profile from TOML text
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_profile_is_default() {
        let profile = BitstreamProfile::from_toml("").unwrap();
        assert_eq!(profile, BitstreamProfile::default());
    }

    #[test]
    fn test_partial_override() {
        let profile = BitstreamProfile::from_toml(
            r#"
            part = "xczu3eg-sbva484-1-e"
            idcode = 0x04a62093
            trailing_nops = 16
            "#,
        )
        .unwrap();
        assert_eq!(profile.part, "xczu3eg-sbva484-1-e");
        assert_eq!(profile.idcode, 0x04A6_2093);
        assert_eq!(profile.trailing_nops, 16);
        assert_eq!(profile.cor0, 0x3800_3FE5);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = BitstreamProfile::from_toml("colour = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "design = \"blinky\"").unwrap();
        let profile = BitstreamProfile::from_path(file.path()).unwrap();
        assert_eq!(profile.design, "blinky");

        let missing = BitstreamProfile::from_path("/nonexistent/profile.toml");
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
