//! File permission classes.
//!
//! Modes are written in the config the way they are written on a shell
//! command line: `600` means `0o600`. The decimal number read from YAML is
//! reinterpreted digit by digit as octal. YAML reads `0600` as a string, so
//! quoted or zero-prefixed digit strings (`"0644"`, `"0o644"`) are accepted
//! too.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::ConfigError;

/// Default mode for certificate-like files (rw-r--r--)
pub const DEFAULT_CERTIFICATE_MODE: u32 = 0o644;

/// Default mode for key-like files (rw-------)
pub const DEFAULT_KEY_MODE: u32 = 0o600;

const MAX_MODE: u32 = 0o7777;

/// Sensitivity class of an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionClass {
    /// Public material: certificate, chain, certificate with chain
    Certificate,
    /// Secret material: private key
    Key,
}

impl PermissionClass {
    /// Mode used when no override is configured
    pub fn default_mode(self) -> u32 {
        match self {
            Self::Certificate => DEFAULT_CERTIFICATE_MODE,
            Self::Key => DEFAULT_KEY_MODE,
        }
    }
}

/// Configured file mode overrides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Mode for certificate-like files, e.g. `644`
    #[serde(default, deserialize_with = "deserialize_mode")]
    pub certificates: Option<u32>,

    /// Mode for key-like files, e.g. `600`
    #[serde(default, deserialize_with = "deserialize_mode")]
    pub keys: Option<u32>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMode {
    Number(u32),
    Digits(String),
}

/// Read a mode written either as a number or as a string of digits
///
/// Digits are kept in their written form (`"0600"` -> `600`); octal
/// interpretation happens in [`parse_mode`].
fn deserialize_mode<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match Option::<RawMode>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawMode::Number(value)) => return Ok(Some(value)),
        Some(RawMode::Digits(digits)) => digits,
    };

    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0o")
        .or_else(|| trimmed.strip_prefix("0O"))
        .unwrap_or(trimmed);

    if digits.is_empty() {
        return Ok(None);
    }

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(de::Error::custom(format!(
            "invalid file mode {:?}: expected octal digits such as 644",
            raw
        )));
    }

    digits
        .parse()
        .map(Some)
        .map_err(|_| de::Error::custom(format!("invalid file mode {:?}: too long", raw)))
}

impl Permissions {
    /// Resolve the effective mode for a permission class
    ///
    /// A missing or zero override falls back to the class default.
    pub fn mode(&self, class: PermissionClass) -> Result<u32, ConfigError> {
        let configured = match class {
            PermissionClass::Certificate => self.certificates,
            PermissionClass::Key => self.keys,
        };

        match configured {
            None | Some(0) => Ok(class.default_mode()),
            Some(value) => parse_mode(value),
        }
    }
}

/// Reinterpret decimal digits as an octal file mode (`644` -> `0o644`)
pub fn parse_mode(value: u32) -> Result<u32, ConfigError> {
    let mode = u32::from_str_radix(&value.to_string(), 8)
        .map_err(|_| ConfigError::InvalidMode { value })?;

    if mode > MAX_MODE {
        return Err(ConfigError::InvalidMode { value });
    }

    Ok(mode)
}
