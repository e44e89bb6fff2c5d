//! List filtering for templates.

use crate::template::{Category, Template, TemplateStatus};

/// Search and facet filter applied by [`TemplateStore::list`].
///
/// Empty `categories` or `statuses` mean "any".
///
/// [`TemplateStore::list`]: super::TemplateStore::list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    /// Case-insensitive substring matched against name, subject and description.
    pub search: Option<String>,
    pub categories: Vec<Category>,
    pub statuses: Vec<TemplateStatus>,
}

impl TemplateFilter {
    pub fn search(mut self, query: impl Into<String>) -> Self {
        self.search = Some(query.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn status(mut self, status: TemplateStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn matches(&self, template: &Template) -> bool {
        self.matches_search(template)
            && (self.categories.is_empty() || self.categories.contains(&template.category()))
            && (self.statuses.is_empty() || self.statuses.contains(&template.status()))
    }

    fn matches_search(&self, template: &Template) -> bool {
        let Some(query) = self.search.as_deref().map(str::trim) else {
            return true;
        };
        if query.is_empty() {
            return true;
        }

        let query = query.to_lowercase();
        let content = template.content();
        content.name.to_lowercase().contains(&query)
            || content.subject.to_lowercase().contains(&query)
            || content
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&query))
    }
}
