use crate::error::IngestError;
use crate::fragment_parser::parse_fragment;
use crate::merge::merge;
use crate::sources::IngestSlot;
use crate::tweet_record::TweetRecord;
use chrono_tz::Tz;
use futures::stream::{self, StreamExt};

/// Every slot that carries a fragment must also name its owner.
pub fn validate_slots(slots: &[IngestSlot]) -> Result<(), IngestError> {
    match slots
        .iter()
        .position(|slot| slot.source.is_some() && slot.owner_label.trim().is_empty())
    {
        Some(slot) => Err(IngestError::MissingLabel { slot }),
        None => Ok(()),
    }
}

/// Read and parse one slot. Read or parse failures are logged and yield no
/// records so that the rest of the batch still goes through.
pub async fn load_slot(slot: &IngestSlot, display_tz: Tz) -> Vec<TweetRecord> {
    let Some(source) = slot.source.as_ref() else {
        return Vec::new();
    };

    let content = match source.read().await {
        Ok(content) => content,
        Err(e) => {
            tracing::warn!(source = %source.describe(), error = %e, "skipping unreadable fragment");
            return Vec::new();
        }
    };

    match parse_fragment(&content, &slot.owner_label, display_tz) {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(source = %source.describe(), error = %e, "skipping unparsable fragment");
            Vec::new()
        }
    }
}

/// Load every slot, up to `concurrency` reads at once, and merge the results
/// in slot order regardless of which read finished first.
pub async fn load_slots(
    slots: &[IngestSlot],
    display_tz: Tz,
    concurrency: usize,
) -> Vec<TweetRecord> {
    let per_slot: Vec<Vec<TweetRecord>> = stream::iter(slots)
        .map(|slot| load_slot(slot, display_tz))
        .buffered(concurrency.max(1))
        .collect()
        .await;

    for (idx, records) in per_slot.iter().enumerate() {
        tracing::debug!(slot = idx, count = records.len(), "slot loaded");
    }

    merge(per_slot)
}
