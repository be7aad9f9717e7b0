//! Target registry access and the staged import.

pub mod api;
#[cfg(feature = "http")]
pub mod http;
pub mod import;

pub use api::{ApiError, RegistryApi, TldInfo};
#[cfg(feature = "http")]
pub use http::RegistryClient;
pub use import::{ImportError, Importer, Stage, stage_order};
