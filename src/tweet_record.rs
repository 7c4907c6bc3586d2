use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Other,
}

impl MediaKind {
    /// Archive exports tag media as `photo`, `video` or `animated_gif`.
    pub fn from_archive_type(kind: &str) -> Self {
        if kind == "photo" {
            MediaKind::Photo
        } else {
            MediaKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub kind: MediaKind,
}

/// One archived message, normalized and tagged with the person it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweetRecord {
    pub display_timestamp: String,
    pub raw_text: String,
    pub attachments: Vec<MediaAttachment>,
    pub owner_label: String,
    pub created_at: DateTime<Utc>,
}

impl TweetRecord {
    pub fn has_photo(&self) -> bool {
        self.attachments
            .iter()
            .any(|media| media.kind == MediaKind::Photo)
    }
}
