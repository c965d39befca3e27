//! POTA API client.
//!
//! [`PotaClient`] implements [`crate::services::pota_api::PotaApi`] over any
//! [`crate::fetch::HttpClient`], retrying transient failures.

mod client;

pub use client::PotaClient;
