//! Client for the optional remote mapping backend.
//!
//! The backend stores mapping rows per project and speaks JSON over HTTP
//! with bearer token authentication. The merge engine never depends on it.

pub mod client;
pub mod config;
pub mod error;
pub mod rows;

pub use client::RemoteClient;
pub use config::RemoteConfig;
pub use error::{RemoteError, Result};
pub use rows::{row_from_json, row_to_json, rows_from_response};
