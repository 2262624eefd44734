use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use founderhub_db::Database;
use founderhub_types::api::{DiscoverResponse, FounderFilter, FounderSort, TrendingNiche};
use founderhub_types::models::{CountableKind, PopularEntity, TrendingGroup, TrendingKind};

use crate::error::{SocialError, SocialResult};
use crate::store::blocking;

pub const MAX_TRENDING_LIMIT: u32 = 100;

/// Read-only rankings. Recent activity is computed from content timestamps,
/// popularity from the cached counters.
#[derive(Clone)]
pub struct TrendingAggregator {
    db: Arc<Database>,
    window_days: u32,
    limit: u32,
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_TRENDING_LIMIT)
}

impl TrendingAggregator {
    pub fn new(db: Arc<Database>, window_days: u32, limit: u32) -> Self {
        Self {
            db,
            window_days,
            limit: clamp_limit(limit),
        }
    }

    pub async fn trending_by_recent_activity(
        &self,
        kind: TrendingKind,
        window_days: u32,
        limit: u32,
    ) -> SocialResult<Vec<TrendingGroup>> {
        self.trending_by_recent_activity_at(Utc::now(), kind, window_days, limit)
            .await
    }

    /// Groups with content created in `[now - window_days, now]`, largest
    /// first; ties go to the group with the most recent item.
    pub async fn trending_by_recent_activity_at(
        &self,
        now: DateTime<Utc>,
        kind: TrendingKind,
        window_days: u32,
        limit: u32,
    ) -> SocialResult<Vec<TrendingGroup>> {
        if window_days == 0 {
            return Err(SocialError::InvalidInput("window_days must be at least 1".into()));
        }
        let since = now - Duration::days(i64::from(window_days));
        let limit = clamp_limit(limit);
        blocking(&self.db, move |db| db.recent_activity_groups(kind, since, limit)).await
    }

    /// Entities ordered by their counters, newest first among equals.
    pub async fn top_by_popularity(
        &self,
        kind: CountableKind,
        limit: u32,
    ) -> SocialResult<Vec<PopularEntity>> {
        let limit = clamp_limit(limit);
        match kind {
            CountableKind::FounderProfile => {
                let founders = blocking(&self.db, move |db| db.top_founders(limit)).await?;
                Ok(founders.into_iter().map(PopularEntity::FounderProfile).collect())
            }
            CountableKind::Story => {
                let stories = blocking(&self.db, move |db| db.top_stories(limit)).await?;
                Ok(stories.into_iter().map(PopularEntity::Story).collect())
            }
        }
    }

    /// Landing-page bundle: most followed founders, busiest niches in the
    /// configured window, newest founders.
    pub async fn discover(&self) -> SocialResult<DiscoverResponse> {
        let (window_days, limit) = (self.window_days, self.limit);
        let groups = self
            .trending_by_recent_activity(TrendingKind::StoriesByNiche, window_days, limit)
            .await?;

        let niche_ids: Vec<Uuid> = groups.iter().map(|g| g.group_key).collect();
        let (trending_founders, niches, recent_founders) = blocking(&self.db, move |db| {
            let recent = FounderFilter {
                sort: FounderSort::New,
                ..Default::default()
            };
            Ok((
                db.top_founders(limit)?,
                db.get_niches_by_ids(&niche_ids)?,
                db.list_founders(&recent, limit, 0)?,
            ))
        })
        .await?;

        Ok(DiscoverResponse {
            trending_founders,
            trending_niches: groups.iter().map(|g| TrendingNiche::resolve(g, &niches)).collect(),
            recent_founders,
        })
    }
}
