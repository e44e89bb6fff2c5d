//! Template store trait definition.

use async_trait::async_trait;

use super::TemplateFilter;
use crate::error::StoreError;
use crate::template::{Template, TemplateContent, TemplateId, TemplateStatus};

/// Persistence capability for templates.
///
/// Implementations must be `Send + Sync` to be shared across async tasks.
/// Every write refreshes the template's derived variables and last-modified
/// time. Routing issues never block a write.
///
/// # Example
///
/// ```ignore
/// use freightmail::store::{InMemoryTemplateStore, TemplateStore, TemplateFilter};
///
/// let store = InMemoryTemplateStore::new();
/// let created = store.create(content).await?;
/// let drafts = store.list(&TemplateFilter::default()).await;
/// ```
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Saves new content under a generated id, in draft status.
    async fn create(&self, content: TemplateContent) -> Result<Template, StoreError>;

    /// Saves new content under a caller-chosen id, in draft status.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] when the id is taken.
    async fn insert(&self, id: TemplateId, content: TemplateContent)
    -> Result<Template, StoreError>;

    async fn get(&self, id: &TemplateId) -> Result<Template, StoreError>;

    /// Replaces the content of an existing template, keeping id and status.
    async fn update(&self, id: &TemplateId, content: TemplateContent)
    -> Result<Template, StoreError>;

    async fn delete(&self, id: &TemplateId) -> Result<(), StoreError>;

    /// Templates matching `filter`, in insertion order.
    async fn list(&self, filter: &TemplateFilter) -> Vec<Template>;

    async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
    ) -> Result<Template, StoreError>;

    /// Stores a draft copy of an existing template under a new id.
    async fn duplicate(&self, id: &TemplateId) -> Result<Template, StoreError>;
}

impl std::fmt::Debug for dyn TemplateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateStore").finish_non_exhaustive()
    }
}
