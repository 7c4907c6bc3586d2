pub mod file;
pub mod inline;

pub use file::FileFragment;
pub use inline::InlineFragment;

use crate::error::SourceError;
use async_trait::async_trait;
use std::sync::Arc;

/// Somewhere the text of one archive fragment can be read from.
#[async_trait]
pub trait FragmentSource: Send + Sync {
    /// Human-readable origin, used in logs.
    fn describe(&self) -> String;
    async fn read(&self) -> Result<String, SourceError>;
}

/// One pending input row: a fragment and whose archive it is.
#[derive(Clone, Default)]
pub struct IngestSlot {
    pub source: Option<Arc<dyn FragmentSource>>,
    pub owner_label: String,
}

impl IngestSlot {
    pub fn new(source: Arc<dyn FragmentSource>, owner_label: impl Into<String>) -> Self {
        Self {
            source: Some(source),
            owner_label: owner_label.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for IngestSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestSlot")
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .field("owner_label", &self.owner_label)
            .finish()
    }
}
