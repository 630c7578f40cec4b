use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;

use hanotify_core::{CoreError, Template, TemplateId, TemplateStore};

/// Template store backed by the `[[templates]]` section of the config
/// file. `replace` swaps the whole set when the file is reloaded.
pub struct ConfigTemplateStore {
    templates: ArcSwap<Vec<Template>>,
}

impl ConfigTemplateStore {
    pub fn new(templates: Vec<Template>) -> Self {
        Self {
            templates: ArcSwap::from_pointee(templates),
        }
    }

    pub fn replace(&self, templates: Vec<Template>) {
        self.templates.store(Arc::new(templates));
    }

    pub fn len(&self) -> usize {
        self.templates.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.load().is_empty()
    }
}

#[async_trait]
impl TemplateStore for ConfigTemplateStore {
    async fn get(&self, id: TemplateId) -> Result<Option<Template>, CoreError> {
        Ok(self.templates.load().iter().find(|t| t.id == id).cloned())
    }

    async fn by_name(&self, name: &str) -> Result<Option<Template>, CoreError> {
        Ok(self
            .templates
            .load()
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .cloned())
    }
}
