use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use founderhub_db::Database;
use founderhub_types::api::{FounderFilter, Page, StoryFilter};
use founderhub_types::events::{ActivityEvent, kinds};
use founderhub_types::models::{Comment, CounterField, FounderProfile, Story};

use crate::counters::{CounterSynchronizer, PendingAdjustment};
use crate::error::{SocialError, SocialResult};
use crate::store::{SocialStore, blocking};

/// Normalized paging request: page is 1-based, size is clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    /// Missing or zero values fall back to page 1 and the default size;
    /// sizes above `max_page_size` are clamped to it.
    pub fn new(
        page: Option<u32>,
        page_size: Option<u32>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        let max = max_page_size.max(1);
        let size = page_size.filter(|s| *s > 0).unwrap_or(default_page_size);
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            page_size: size.clamp(1, max),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    pub fn page_of<T>(&self, items: Vec<T>, total: u64) -> Page<T> {
        Page {
            items,
            page: self.page,
            total_pages: total_pages(total, self.page_size),
        }
    }
}

/// `max(1, ceil(total / page_size))`.
pub fn total_pages(total: u64, page_size: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let pages = total.div_ceil(size).max(1);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Paginated read path. Detail reads bump view counters atomically.
pub struct FeedReader<S> {
    db: Arc<Database>,
    counters: CounterSynchronizer<S>,
    default_page_size: u32,
    max_page_size: u32,
}

impl<S> Clone for FeedReader<S> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            counters: self.counters.clone(),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
        }
    }
}

impl<S: SocialStore> FeedReader<S> {
    pub fn new(
        db: Arc<Database>,
        counters: CounterSynchronizer<S>,
        default_page_size: u32,
        max_page_size: u32,
    ) -> Self {
        Self {
            db,
            counters,
            default_page_size,
            max_page_size,
        }
    }

    pub fn paginate(&self, page: Option<u32>, page_size: Option<u32>) -> Pagination {
        Pagination::new(page, page_size, self.default_page_size, self.max_page_size)
    }

    /// Stories newest first.
    pub async fn list_stories(
        &self,
        filter: StoryFilter,
        paging: Pagination,
    ) -> SocialResult<Page<Story>> {
        let (items, total) = blocking(&self.db, move |db| {
            let total = db.count_stories(&filter)?;
            let items = db.list_stories(&filter, paging.page_size, paging.offset())?;
            Ok((items, total))
        })
        .await?;
        Ok(paging.page_of(items, total))
    }

    /// Founders newest first, or by popularity with `sort=top`.
    pub async fn list_founders(
        &self,
        filter: FounderFilter,
        paging: Pagination,
    ) -> SocialResult<Page<FounderProfile>> {
        let (items, total) = blocking(&self.db, move |db| {
            let total = db.count_founders(&filter)?;
            let items = db.list_founders(&filter, paging.page_size, paging.offset())?;
            Ok((items, total))
        })
        .await?;
        Ok(paging.page_of(items, total))
    }

    /// Comments oldest first.
    pub async fn list_comments(
        &self,
        story_id: Uuid,
        paging: Pagination,
    ) -> SocialResult<Page<Comment>> {
        let (exists, items, total) = blocking(&self.db, move |db| {
            if !db.story_exists(story_id)? {
                return Ok((false, vec![], 0));
            }
            let total = db.count_comments(story_id)?;
            let items = db.list_comments(story_id, paging.page_size, paging.offset())?;
            Ok((true, items, total))
        })
        .await?;

        if !exists {
            return Err(SocialError::not_found("story", story_id));
        }
        Ok(paging.page_of(items, total))
    }

    /// Read a story and count the view.
    pub async fn view_story(&self, story_id: Uuid, viewer: Option<Uuid>) -> SocialResult<Story> {
        let mut story = blocking(&self.db, move |db| db.get_story(story_id))
            .await?
            .ok_or_else(|| SocialError::not_found("story", story_id))?;

        if let Some(views) = self.count_view(story_id, CounterField::ViewCount).await? {
            story.view_count = views;
        }
        self.record_view(kinds::STORY_VIEW, viewer, story_id).await;
        Ok(story)
    }

    /// Read a founder profile and count the view.
    pub async fn view_founder(
        &self,
        founder_profile_id: Uuid,
        viewer: Option<Uuid>,
    ) -> SocialResult<FounderProfile> {
        let mut profile = blocking(&self.db, move |db| db.get_founder_profile(founder_profile_id))
            .await?
            .ok_or_else(|| SocialError::not_found("founder profile", founder_profile_id))?;

        // Owners looking at their own profile do not count.
        if viewer != Some(profile.user_id) {
            let views = self.count_view(founder_profile_id, CounterField::ProfileViews).await?;
            if let Some(views) = views {
                profile.stats.profile_views = views;
            }
            self.record_view(kinds::PROFILE_VIEW, viewer, founder_profile_id).await;
        }
        Ok(profile)
    }

    async fn count_view(&self, id: Uuid, field: CounterField) -> SocialResult<Option<u64>> {
        match self.counters.adjust(id, field, 1).await {
            Ok(Some(value)) => Ok(Some(value)),
            // Deleted between the read and the increment.
            Ok(None) => Err(SocialError::not_found(field.owner().as_str(), id)),
            Err(e) if e.is_transient() => {
                warn!("{} on {} deferred: {}", field, id, e);
                self.counters
                    .defer(PendingAdjustment {
                        entity_id: id,
                        field,
                        delta: 1,
                    })
                    .await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn record_view(&self, kind: &'static str, viewer: Option<Uuid>, target: Uuid) {
        let event = ActivityEvent {
            id: Uuid::new_v4(),
            user_id: viewer,
            kind: kind.to_string(),
            target_id: Some(target),
            metadata: None,
            created_at: Utc::now(),
        };
        if let Err(e) = blocking(&self.db, move |db| db.insert_event(&event)).await {
            warn!("Failed to record {} for {}: {}", kind, target, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::DriftLedger;
    use crate::testing::{FlakyStore, Seed, fast_retry, wait_for};
    use chrono::Duration;

    fn reader(seed: &Seed) -> FeedReader<Database> {
        let (counters, worker) =
            CounterSynchronizer::new(seed.db.clone(), fast_retry(), DriftLedger::default());
        tokio::spawn(worker.run());
        FeedReader::new(seed.db.clone(), counters, 10, 50)
    }

    #[test]
    fn test_total_pages_math() {
        for page_size in [1u32, 7, 10, 50] {
            let ps = u64::from(page_size);
            let cases = [(0, 1), (1, 1), (ps, 1), (ps + 1, 2), (10 * ps, 10)];
            for (total, expected) in cases {
                assert_eq!(
                    total_pages(total, page_size),
                    expected,
                    "total={} size={}",
                    total,
                    page_size
                );
            }
        }
    }

    #[test]
    fn test_pagination_clamps() {
        let p = Pagination::new(None, None, 10, 50);
        assert_eq!((p.page, p.page_size, p.offset()), (1, 10, 0));

        let p = Pagination::new(Some(3), Some(500), 10, 50);
        assert_eq!((p.page, p.page_size, p.offset()), (3, 50, 100));

        let p = Pagination::new(Some(0), Some(0), 10, 50);
        assert_eq!((p.page, p.page_size), (1, 10));
    }

    #[tokio::test]
    async fn test_list_stories_newest_first() {
        let seed = Seed::new();
        let feed = reader(&seed);
        let now = Utc::now();
        let older = seed.post_story(seed.niche, now - Duration::days(2));
        let newest = seed.post_story(seed.niche, now + Duration::seconds(1));

        let page = feed
            .list_stories(StoryFilter::default(), feed.paginate(Some(1), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, newest);

        let last = feed
            .list_stories(StoryFilter::default(), feed.paginate(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id, older);
    }

    #[tokio::test]
    async fn test_empty_listing_has_one_page() {
        let seed = Seed::new();
        let feed = reader(&seed);
        let filter = StoryFilter {
            niche_id: Some(Uuid::new_v4()),
            ..Default::default()
        };
        let page = feed.list_stories(filter, feed.paginate(None, None)).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!((page.page, page.total_pages), (1, 1));
    }

    #[tokio::test]
    async fn test_view_story_counts_and_logs() {
        let seed = Seed::new();
        let feed = reader(&seed);

        let first = feed.view_story(seed.story, Some(seed.fan)).await.unwrap();
        let second = feed.view_story(seed.story, None).await.unwrap();
        assert_eq!(first.view_count, 1);
        assert_eq!(second.view_count, 2);
        assert_eq!(seed.db.count_events(kinds::STORY_VIEW, Some(seed.story)).unwrap(), 2);

        let err = feed.view_story(Uuid::new_v4(), None).await.unwrap_err();
        assert!(matches!(err, SocialError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_owner_view_not_counted() {
        let seed = Seed::new();
        let feed = reader(&seed);

        let own = feed.view_founder(seed.founder_profile, Some(seed.owner)).await.unwrap();
        assert_eq!(own.stats.profile_views, 0);
        let other = feed.view_founder(seed.founder_profile, Some(seed.fan)).await.unwrap();
        assert_eq!(other.stats.profile_views, 1);
    }

    #[tokio::test]
    async fn test_transient_view_failure_is_deferred() {
        let seed = Seed::new();
        let store = Arc::new(FlakyStore::new(seed.db.clone()));
        let (counters, worker) =
            CounterSynchronizer::new(store.clone(), fast_retry(), DriftLedger::default());
        tokio::spawn(worker.run());
        let feed = FeedReader::new(seed.db.clone(), counters.clone(), 10, 50);

        store.fail_next_adjustments(1);
        let story = feed.view_story(seed.story, None).await.unwrap();
        assert_eq!(story.view_count, 0);

        wait_for(|| counters.pending_retries() == 0).await;
        assert_eq!(seed.counter(seed.story, CounterField::ViewCount), 1);

        // The next read sees the deferred increment plus its own.
        let story = feed.view_story(seed.story, None).await.unwrap();
        assert_eq!(story.view_count, 2);
    }

    #[tokio::test]
    async fn test_list_comments_missing_story() {
        let seed = Seed::new();
        let feed = reader(&seed);
        let err = feed
            .list_comments(Uuid::new_v4(), feed.paginate(None, None))
            .await
            .unwrap_err();
        assert!(matches!(err, SocialError::NotFound { entity: "story", .. }));
    }
}
