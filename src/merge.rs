use crate::tweet_record::TweetRecord;

/// Concatenate per-slot record sequences in slot order.
///
/// Order inside each slot is kept and nothing is sorted or deduplicated, so
/// ingesting the same fragment twice yields every record twice.
pub fn merge(per_slot: Vec<Vec<TweetRecord>>) -> Vec<TweetRecord> {
    let total = per_slot.iter().map(Vec::len).sum();
    let mut merged = Vec::with_capacity(total);
    for records in per_slot {
        merged.extend(records);
    }
    merged
}
