//! The per-session timeline: the merged record set, the list currently on
//! display, and the reveal window over it.

use crate::cache::PersistenceCache;
use crate::config::Config;
use crate::error::{ConfigError, IngestError, StoreError};
use crate::ingest::{load_slots, validate_slots};
use crate::pagination::PaginationFeed;
use crate::query::{self, DateRange, SortDirection};
use crate::sources::IngestSlot;
use crate::tweet_record::TweetRecord;
use chrono_tz::Tz;
use tokio::task::JoinHandle;

/// What the view layer is showing and how much of it.
#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub current_list: Vec<TweetRecord>,
    pub feed: PaginationFeed,
}

impl ViewState {
    fn replace(&mut self, list: Vec<TweetRecord>) {
        self.feed.reset(list.len());
        self.current_list = list;
    }

    pub fn visible(&self) -> &[TweetRecord] {
        self.feed.window(&self.current_list)
    }
}

/// Result of an ingest. The cache write runs in the background; await
/// `persisted` only when durability matters.
pub struct IngestOutcome {
    pub record_count: usize,
    pub persisted: JoinHandle<Result<(), StoreError>>,
}

pub struct Session {
    cache: PersistenceCache,
    display_tz: Tz,
    read_concurrency: usize,
    slots: Vec<IngestSlot>,
    superset: Vec<TweetRecord>,
    view: ViewState,
    date_range: DateRange,
    search_query: String,
}

impl Session {
    pub fn new(
        cache: PersistenceCache,
        page_size: usize,
        display_tz: Tz,
        read_concurrency: usize,
    ) -> Self {
        Self {
            cache,
            display_tz,
            read_concurrency: read_concurrency.max(1),
            slots: vec![IngestSlot::empty()],
            superset: Vec::new(),
            view: ViewState {
                current_list: Vec::new(),
                feed: PaginationFeed::new(page_size, 0),
            },
            date_range: DateRange::default(),
            search_query: String::new(),
        }
    }

    pub fn from_config(cache: PersistenceCache, config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(
            cache,
            config.page_size,
            config.display_tz()?,
            config.read_concurrency,
        ))
    }

    pub fn display_tz(&self) -> Tz {
        self.display_tz
    }

    pub fn superset(&self) -> &[TweetRecord] {
        &self.superset
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn current_list(&self) -> &[TweetRecord] {
        &self.view.current_list
    }

    pub fn visible(&self) -> &[TweetRecord] {
        self.view.visible()
    }

    pub fn visible_count(&self) -> usize {
        self.view.feed.visible_count()
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    // --- ingest slots ---

    pub fn slots(&self) -> &[IngestSlot] {
        &self.slots
    }

    pub fn add_slot(&mut self) -> usize {
        self.slots.push(IngestSlot::empty());
        self.slots.len() - 1
    }

    /// Replace the slot at `index`. Returns false when out of range.
    pub fn set_slot(&mut self, index: usize, slot: IngestSlot) -> bool {
        match self.slots.get_mut(index) {
            Some(existing) => {
                *existing = slot;
                true
            }
            None => false,
        }
    }

    pub fn remove_slot(&mut self, index: usize) -> Option<IngestSlot> {
        (index < self.slots.len()).then(|| self.slots.remove(index))
    }

    // --- superset lifecycle ---

    /// Load the cached timeline, if any, as the starting superset.
    /// An empty cache is not an error and leaves the session empty.
    pub async fn restore(&mut self) -> Result<usize, StoreError> {
        let Some(records) = self.cache.load_timeline().await? else {
            tracing::info!("no cached timeline");
            return Ok(0);
        };
        tracing::info!(count = records.len(), "restored cached timeline");
        self.replace_superset(records);
        Ok(self.superset.len())
    }

    /// Read every slot, merge, sort newest first and make the result the
    /// superset. Fragments that fail to read or parse contribute nothing.
    pub async fn ingest(&mut self) -> Result<IngestOutcome, IngestError> {
        validate_slots(&self.slots)?;

        let merged = load_slots(&self.slots, self.display_tz, self.read_concurrency).await;
        let sorted = query::sort_by_time(&merged, SortDirection::Descending);
        tracing::info!(
            slots = self.slots.len(),
            count = sorted.len(),
            "ingested fragments"
        );

        // Reserved here, not in the task, so a later clear or ingest wins
        // no matter when this write gets scheduled.
        let ticket = self.cache.reserve_write();
        let cache = self.cache.clone();
        let snapshot = sorted.clone();
        let persisted = tokio::spawn(async move {
            let result = cache.save_timeline_ordered(ticket, &snapshot).await;
            if let Err(e) = &result {
                tracing::error!(error = %e, "failed to cache timeline");
            }
            result.map(|_| ())
        });

        self.replace_superset(sorted);
        Ok(IngestOutcome {
            record_count: self.superset.len(),
            persisted,
        })
    }

    /// Set the slots and ingest them in one go.
    pub async fn ingest_slots(
        &mut self,
        slots: Vec<IngestSlot>,
    ) -> Result<IngestOutcome, IngestError> {
        self.slots = slots;
        self.ingest().await
    }

    /// Forget every record, in memory and in the cache. The in-memory reset
    /// happens even when the cache cannot be cleared. Cache writes from
    /// earlier ingests that have not landed yet are dropped.
    pub async fn clear(&mut self) -> Result<(), StoreError> {
        self.replace_superset(Vec::new());
        self.cache.open().await?;
        self.cache.clear().await?;
        tracing::info!("cleared timeline");
        Ok(())
    }

    fn replace_superset(&mut self, records: Vec<TweetRecord>) {
        self.superset = records;
        self.date_range = DateRange::default();
        self.search_query.clear();
        self.view.replace(self.superset.clone());
    }

    // --- queries, each re-derived from the superset ---

    pub fn sort_by_time(&mut self, direction: SortDirection) {
        let list = query::sort_by_time(&self.superset, direction);
        self.view.replace(list);
    }

    /// Remember a range without applying it yet.
    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
    }

    pub fn apply_date_range(&mut self) {
        let list = query::filter_by_date_range(&self.superset, &self.date_range);
        self.view.replace(list);
    }

    pub fn filter_by_date_range(&mut self, range: DateRange) {
        self.set_date_range(range);
        self.apply_date_range();
    }

    pub fn filter_by_media(&mut self) {
        let list = query::filter_by_media(&self.superset);
        self.view.replace(list);
    }

    pub fn search(&mut self, text: &str) {
        self.search_query = text.to_string();
        let list = query::search(&self.superset, text);
        self.view.replace(list);
    }

    /// Show the whole superset again and drop the date range.
    pub fn reset(&mut self) {
        self.date_range = DateRange::default();
        let list = query::reset(&self.superset);
        self.view.replace(list);
    }

    // --- reveal window ---

    /// The last rendered record became visible; reveal another page if any remain.
    pub fn on_sentinel_visible(&mut self) -> bool {
        let len = self.view.current_list.len();
        self.view.feed.on_sentinel_visible(len)
    }

    pub fn has_more(&self) -> bool {
        self.view.feed.has_more(self.view.current_list.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::InlineFragment;
    use std::sync::Arc;

    const TZ: Tz = chrono_tz::UTC;

    fn fragment(entries: &[(&str, &str, bool)]) -> String {
        let body: Vec<String> = entries
            .iter()
            .map(|(created_at, text, photo)| {
                let media = if *photo {
                    r#", "extended_entities": {"media": [{"media_url_https": "https://pbs.twimg.com/media/p.jpg", "type": "photo"}]}"#
                } else {
                    ""
                };
                format!(
                    r#"{{"tweet": {{"created_at": "{}", "full_text": "{}"{}}}}}"#,
                    created_at, text, media
                )
            })
            .collect();
        format!("window.YTD.tweets.part0 = [{}];", body.join(",\n"))
    }

    fn slot(content: String, owner: &str) -> IngestSlot {
        IngestSlot::new(Arc::new(InlineFragment::new(owner, content)), owner)
    }

    fn texts(records: &[TweetRecord]) -> Vec<&str> {
        records.iter().map(|r| r.raw_text.as_str()).collect()
    }

    fn session(page_size: usize) -> Session {
        Session::new(PersistenceCache::in_memory(), page_size, TZ, 2)
    }

    fn two_people() -> Vec<IngestSlot> {
        vec![
            slot(
                fragment(&[
                    ("Mon Jan 01 10:00:00 +0000 2024", "a-old", false),
                    ("Fri Jan 05 10:00:00 +0000 2024", "a-new", true),
                ]),
                "alice",
            ),
            slot(
                fragment(&[("Wed Jan 03 10:00:00 +0000 2024", "b-mid", false)]),
                "bob",
            ),
        ]
    }

    #[test]
    fn test_new_session_is_empty_with_one_slot() {
        let s = session(10);
        assert!(s.superset().is_empty());
        assert!(s.visible().is_empty());
        assert_eq!(s.slots().len(), 1);
        assert!(s.slots()[0].source.is_none());
    }

    #[test]
    fn test_slot_management() {
        let mut s = session(10);
        assert_eq!(s.add_slot(), 1);
        assert!(s.set_slot(1, slot(fragment(&[]), "bob")));
        assert!(!s.set_slot(5, IngestSlot::empty()));
        assert_eq!(s.slots()[1].owner_label, "bob");

        let removed = s.remove_slot(0).unwrap();
        assert!(removed.source.is_none());
        assert_eq!(s.slots().len(), 1);
        assert!(s.remove_slot(3).is_none());
    }

    #[tokio::test]
    async fn test_ingest_sorts_newest_first_and_persists() {
        let cache = PersistenceCache::in_memory();
        let mut s = Session::new(cache.clone(), 10, TZ, 2);
        let outcome = s.ingest_slots(two_people()).await.unwrap();
        outcome.persisted.await.unwrap().unwrap();

        assert_eq!(outcome.record_count, 3);
        assert_eq!(texts(s.superset()), vec!["a-new", "b-mid", "a-old"]);
        assert_eq!(s.current_list(), s.superset());
        assert_eq!(cache.load_timeline().await.unwrap().unwrap(), s.superset());
    }

    #[tokio::test]
    async fn test_ingest_requires_labels() {
        let mut s = session(10);
        let err = s
            .ingest_slots(vec![slot(fragment(&[]), "")])
            .await
            .err()
            .unwrap();
        assert!(matches!(err, IngestError::MissingLabel { slot: 0 }));
    }

    #[tokio::test]
    async fn test_filters_do_not_stack() {
        let mut s = session(10);
        s.ingest_slots(two_people()).await.unwrap();

        s.filter_by_date_range(DateRange::from_dates(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 2),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 4),
            TZ,
        ));
        assert_eq!(texts(s.current_list()), vec!["b-mid"]);

        // media filter starts over from the superset
        s.filter_by_media();
        assert_eq!(texts(s.current_list()), vec!["a-new"]);

        s.search("alice");
        assert_eq!(texts(s.current_list()), vec!["a-new", "a-old"]);
        assert_eq!(s.search_query(), "alice");

        s.sort_by_time(SortDirection::Ascending);
        assert_eq!(texts(s.current_list()), vec!["a-old", "b-mid", "a-new"]);
    }

    #[tokio::test]
    async fn test_reset_clears_date_range() {
        let mut s = session(10);
        s.ingest_slots(two_people()).await.unwrap();

        let range = DateRange::from_dates(chrono::NaiveDate::from_ymd_opt(2024, 1, 4), None, TZ);
        s.filter_by_date_range(range);
        assert_eq!(s.date_range(), range);
        assert_eq!(texts(s.current_list()), vec!["a-new"]);

        s.reset();
        assert!(s.date_range().is_unbounded());
        assert_eq!(s.current_list(), s.superset());
    }

    #[tokio::test]
    async fn test_every_list_change_resets_the_window() {
        use chrono::{TimeZone, Utc};

        let entries: Vec<(String, String)> = (1..=9)
            .map(|day| {
                let at = Utc.with_ymd_and_hms(2024, 1, day, 10, 0, 0).unwrap();
                (
                    at.format("%a %b %d %H:%M:%S +0000 %Y").to_string(),
                    format!("t{}", day),
                )
            })
            .collect();
        let borrowed: Vec<(&str, &str, bool)> = entries
            .iter()
            .map(|(c, t)| (c.as_str(), t.as_str(), false))
            .collect();

        let mut s = session(4);
        s.ingest_slots(vec![slot(fragment(&borrowed), "alice")])
            .await
            .unwrap();
        assert_eq!(s.superset().len(), 9);
        assert_eq!(s.visible_count(), 4);

        assert!(s.on_sentinel_visible());
        assert!(s.on_sentinel_visible());
        assert_eq!(s.visible_count(), 9);
        assert!(!s.on_sentinel_visible());
        assert!(!s.has_more());

        s.search("t");
        assert_eq!(s.visible_count(), 4);
        s.on_sentinel_visible();
        s.sort_by_time(SortDirection::Ascending);
        assert_eq!(s.visible_count(), 4);
        s.on_sentinel_visible();
        s.filter_by_media();
        assert_eq!(s.visible_count(), 0);
        s.reset();
        assert_eq!(s.visible_count(), 4);
        assert_eq!(texts(s.visible()), vec!["t9", "t8", "t7", "t6"]);
    }

    #[tokio::test]
    async fn test_restore_from_cache() {
        let cache = PersistenceCache::in_memory();
        let mut first = Session::new(cache.clone(), 10, TZ, 2);
        first
            .ingest_slots(two_people())
            .await
            .unwrap()
            .persisted
            .await
            .unwrap()
            .unwrap();

        let mut second = Session::new(cache, 10, TZ, 2);
        assert_eq!(second.restore().await.unwrap(), 3);
        assert_eq!(second.superset(), first.superset());
        assert_eq!(second.current_list(), first.superset());
    }

    #[tokio::test]
    async fn test_restore_empty_cache_is_fine() {
        let mut s = session(10);
        assert_eq!(s.restore().await.unwrap(), 0);
        assert!(s.superset().is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_session_and_cache() {
        let cache = PersistenceCache::in_memory();
        let mut s = Session::new(cache.clone(), 10, TZ, 2);
        s.ingest_slots(two_people())
            .await
            .unwrap()
            .persisted
            .await
            .unwrap()
            .unwrap();

        s.clear().await.unwrap();
        assert!(s.superset().is_empty());
        assert!(s.current_list().is_empty());
        assert_eq!(cache.load_timeline().await.unwrap(), None);
    }
}
