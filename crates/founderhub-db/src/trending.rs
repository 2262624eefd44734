use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

use founderhub_types::models::{FounderProfile, Story, TrendingGroup, TrendingKind};

use crate::models::parse_id;
use crate::queries::{
    FOUNDER_COLUMNS, POPULAR_FOUNDER_ORDER, POPULAR_STORY_ORDER, STORY_COLUMNS, founder_row,
    story_row,
};
use crate::{Database, fmt_ts, parse_ts};

/// Content table and grouping column behind each trending kind.
fn activity_source(kind: TrendingKind) -> (&'static str, &'static str) {
    match kind {
        TrendingKind::StoriesByNiche => ("stories", "niche_id"),
        TrendingKind::StoriesByFounder => ("stories", "founder_profile_id"),
        TrendingKind::CommentsByStory => ("comments", "story_id"),
    }
}

impl Database {
    /// Count content created at or after `since`, grouped by the kind's key.
    /// Ordered by count, then most recent activity, then key.
    pub fn recent_activity_groups(
        &self,
        kind: TrendingKind,
        since: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<TrendingGroup>> {
        let (table, key) = activity_source(kind);
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {key}, COUNT(*) AS n, MAX(created_at) AS latest
                 FROM {table}
                 WHERE created_at >= ?1
                 GROUP BY {key}
                 ORDER BY n DESC, latest DESC, {key} ASC
                 LIMIT ?2"
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![fmt_ts(&since), limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows
                .into_iter()
                .map(|(group, n, latest)| TrendingGroup {
                    group_key: parse_id(&group, key, table),
                    count: n as u64,
                    latest_at: parse_ts(&latest),
                })
                .collect())
        })
    }

    pub fn top_founders(&self, limit: u32) -> Result<Vec<FounderProfile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM founder_profiles ORDER BY {} LIMIT ?1",
                FOUNDER_COLUMNS, POPULAR_FOUNDER_ORDER
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], founder_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(FounderProfile::from).collect())
        })
    }

    pub fn top_stories(&self, limit: u32) -> Result<Vec<Story>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM stories ORDER BY {} LIMIT ?1",
                STORY_COLUMNS, POPULAR_STORY_ORDER
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([limit], story_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Story::from).collect())
        })
    }
}
