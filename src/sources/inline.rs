use super::FragmentSource;
use crate::error::SourceError;
use async_trait::async_trait;

/// Fragment text already held in memory, e.g. an upload body.
pub struct InlineFragment {
    name: String,
    content: String,
}

impl InlineFragment {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

#[async_trait]
impl FragmentSource for InlineFragment {
    fn describe(&self) -> String {
        self.name.clone()
    }

    async fn read(&self) -> Result<String, SourceError> {
        Ok(self.content.clone())
    }
}
