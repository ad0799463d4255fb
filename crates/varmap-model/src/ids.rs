#![deny(unsafe_code)]

use std::borrow::Borrow;
use std::fmt;

use crate::columns::is_internal_column;
use crate::error::{ModelError, Result};

#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct ColumnName(String);

impl ColumnName {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidColumnName(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_internal(&self) -> bool {
        is_internal_column(&self.0)
    }
}

impl Borrow<str> for ColumnName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Prefix of a tree leaf identity. A leaf is always `ROW:<row key>`.
pub const LEAF_PREFIX: &str = "ROW:";

/// Number of hex characters kept from the row digest (40 bits).
///
/// At a few thousand rows per table the birthday bound stays far below one
/// collision in a million tables. This is an identity token, not a security
/// boundary.
pub const ROW_KEY_LEN: usize = 10;

/// A short content-derived row identity rendered as lowercase hex.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct RowKey(String);

impl RowKey {
    /// Build a key from a hex-encoded digest, keeping the first [`ROW_KEY_LEN`] characters.
    pub fn from_digest_hex(digest_hex: &str) -> Self {
        Self(
            digest_hex
                .chars()
                .take(ROW_KEY_LEN)
                .map(|ch| ch.to_ascii_lowercase())
                .collect(),
        )
    }

    /// Parse a key received from outside (selection references, remote rows).
    ///
    /// Keys produced by older deployments may have a different length, so any
    /// non-empty hex string is accepted.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || !trimmed.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(ModelError::InvalidRowKey(raw.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tree leaf identity for this key.
    pub fn leaf_value(&self) -> String {
        format!("{LEAF_PREFIX}{}", self.0)
    }
}

impl TryFrom<String> for RowKey {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<RowKey> for String {
    fn from(key: RowKey) -> Self {
        key.0
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
