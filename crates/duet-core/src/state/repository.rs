//! State repository trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::state::model::StateDocument;

/// Storage for the single local state document.
#[async_trait]
pub trait StateRepository: Send + Sync {
    /// Loads the document. A missing document is `Ok(None)`.
    async fn load(&self) -> Result<Option<StateDocument>>;

    /// Replaces the stored document atomically.
    async fn save(&self, document: &StateDocument) -> Result<()>;
}
