//! In-memory template store.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{TemplateFilter, TemplateStore};
use crate::error::StoreError;
use crate::routing::RoutingValidator;
use crate::template::{Template, TemplateContent, TemplateId, TemplateStatus};

/// Template store backed by a vector, preserving insertion order.
///
/// Routing issues found on save are logged as warnings and never reject the
/// write.
#[derive(Debug, Default)]
pub struct InMemoryTemplateStore {
    templates: RwLock<Vec<Template>>,
    validator: RoutingValidator,
}

impl InMemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose save-time routing check uses `validator`.
    pub fn with_validator(validator: RoutingValidator) -> Self {
        Self {
            templates: RwLock::new(Vec::new()),
            validator,
        }
    }

    pub async fn len(&self) -> usize {
        self.templates.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.templates.read().await.is_empty()
    }

    fn log_routing_issues(&self, template: &Template) {
        let report = template.validate_routing(&self.validator);
        for issue in report.issues() {
            tracing::warn!(
                template_id = %template.id(),
                severity = ?issue.severity(),
                issue = %issue,
                "Routing issue in saved template"
            );
        }
    }

    fn not_found(id: &TemplateId) -> StoreError {
        StoreError::NotFound {
            id: id.to_string(),
        }
    }
}

#[async_trait]
impl TemplateStore for InMemoryTemplateStore {
    async fn create(&self, content: TemplateContent) -> Result<Template, StoreError> {
        self.insert(TemplateId::generate(), content).await
    }

    async fn insert(
        &self,
        id: TemplateId,
        content: TemplateContent,
    ) -> Result<Template, StoreError> {
        let mut templates = self.templates.write().await;
        if templates.iter().any(|t| t.id() == &id) {
            return Err(StoreError::AlreadyExists { id: id.to_string() });
        }

        let template = Template::new(id, content)?;
        self.log_routing_issues(&template);
        tracing::debug!(
            template_id = %template.id(),
            variables = template.variables().len(),
            "Template created"
        );
        templates.push(template.clone());
        Ok(template)
    }

    async fn get(&self, id: &TemplateId) -> Result<Template, StoreError> {
        self.templates
            .read()
            .await
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn update(
        &self,
        id: &TemplateId,
        content: TemplateContent,
    ) -> Result<Template, StoreError> {
        let mut templates = self.templates.write().await;
        let template = templates
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| Self::not_found(id))?;

        template.update(content)?;
        self.log_routing_issues(template);
        tracing::debug!(template_id = %id, "Template updated");
        Ok(template.clone())
    }

    async fn delete(&self, id: &TemplateId) -> Result<(), StoreError> {
        let mut templates = self.templates.write().await;
        let index = templates
            .iter()
            .position(|t| t.id() == id)
            .ok_or_else(|| Self::not_found(id))?;
        templates.remove(index);
        tracing::debug!(template_id = %id, "Template deleted");
        Ok(())
    }

    async fn list(&self, filter: &TemplateFilter) -> Vec<Template> {
        self.templates
            .read()
            .await
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect()
    }

    async fn set_status(
        &self,
        id: &TemplateId,
        status: TemplateStatus,
    ) -> Result<Template, StoreError> {
        let mut templates = self.templates.write().await;
        let template = templates
            .iter_mut()
            .find(|t| t.id() == id)
            .ok_or_else(|| Self::not_found(id))?;

        let previous = template.status();
        template.set_status(status);
        tracing::info!(
            template_id = %id,
            from = %previous,
            to = %status,
            "Template status changed"
        );
        Ok(template.clone())
    }

    async fn duplicate(&self, id: &TemplateId) -> Result<Template, StoreError> {
        let mut templates = self.templates.write().await;
        let copy = templates
            .iter()
            .find(|t| t.id() == id)
            .map(|t| t.duplicate(TemplateId::generate()))
            .ok_or_else(|| Self::not_found(id))?;

        tracing::debug!(template_id = %id, copy_id = %copy.id(), "Template duplicated");
        templates.push(copy.clone());
        Ok(copy)
    }
}
