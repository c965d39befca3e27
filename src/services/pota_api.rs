//! Trait for the remote POTA data source.

use anyhow::Result;

use crate::aggregator::ActivationSummary;
use crate::model::{ActivationEvent, ContactRecord};

/// Abstraction over the POTA API, so hosts and tests can swap the source.
#[async_trait::async_trait]
pub trait PotaApi: Send + Sync {
    /// Activators on the air right now, one spot per report.
    async fn list_spots(&self) -> Result<Vec<ActivationEvent>>;

    /// Every recorded activation of `reference`, newest first.
    async fn park_activations(&self, reference: &str) -> Result<Vec<ActivationSummary>>;

    /// The signed-in user's own activations. Needs an id token.
    async fn user_activations(&self) -> Result<Vec<ContactRecord>>;
}
