#![deny(unsafe_code)]

use std::fmt;

use chrono::{DateTime, Utc};

use crate::RowKey;

/// Where a row came from within the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Provenance {
    /// Added through the manual "add a variable" action.
    #[serde(default)]
    pub user_created: bool,
    /// Time of the upload (or manual add) that last wrote this row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Key of the base row this overlay row supersedes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replaces: Option<RowKey>,
}

impl Provenance {
    pub fn uploaded(at: DateTime<Utc>) -> Self {
        Self {
            user_created: false,
            uploaded_at: Some(at),
            replaces: None,
        }
    }

    pub fn created(at: DateTime<Utc>) -> Self {
        Self {
            user_created: true,
            uploaded_at: Some(at),
            replaces: None,
        }
    }

    /// Origin label, created > uploaded > base.
    pub fn origin(&self) -> Origin {
        if self.user_created {
            Origin::UserCreated
        } else if self.uploaded_at.is_some() {
            Origin::UserUpload
        } else {
            Origin::Base
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Origin {
    Base,
    UserUpload,
    UserCreated,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "Base",
            Self::UserUpload => "User upload",
            Self::UserCreated => "User created",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
