//! Database row types. These map directly to SQLite rows and are kept apart
//! from the founderhub-types API models so the DB layer stays independent.

use founderhub_types::events::ActivityEvent;
use founderhub_types::models::{Comment, FounderProfile, FounderStats, Niche, Story, User, UserRole};
use tracing::warn;
use uuid::Uuid;

use crate::parse_ts;

pub struct UserRow {
    pub id: String,
    pub display_name: String,
    pub role: String,
    pub created_at: String,
}

pub struct NicheRow {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub created_at: String,
}

pub struct FounderProfileRow {
    pub id: String,
    pub user_id: String,
    pub brand_name: Option<String>,
    pub about_founder: String,
    pub story_highlights: String,
    pub niche_id: String,
    pub region: Option<String>,
    pub story_count: i64,
    pub followers_count: i64,
    pub profile_views: i64,
    pub created_at: String,
}

pub struct StoryRow {
    pub id: String,
    pub author_id: String,
    pub founder_profile_id: String,
    pub text: String,
    pub media_urls: String,
    pub niche_id: String,
    pub region: Option<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub story_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
}

pub struct EventRow {
    pub id: String,
    pub user_id: Option<String>,
    pub kind: String,
    pub target_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// Parse a stored id, logging and substituting the nil UUID on corruption.
pub(crate) fn parse_id(raw: &str, what: &str, row_id: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}' on row '{}': {}", what, raw, row_id, e);
        Uuid::default()
    })
}

fn parse_list(raw: &str, what: &str, row_id: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Corrupt {} on row '{}': {}", what, row_id, e);
        Vec::new()
    })
}

fn count(value: i64) -> u64 {
    value.max(0) as u64
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            role: row.role.parse().unwrap_or_else(|_| {
                warn!("Unknown role '{}' on user '{}'", row.role, row.id);
                UserRole::Supporter
            }),
            display_name: row.display_name,
            created_at: parse_ts(&row.created_at),
        }
    }
}

impl From<NicheRow> for Niche {
    fn from(row: NicheRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            name: row.name,
            slug: row.slug,
            created_at: parse_ts(&row.created_at),
        }
    }
}

impl From<FounderProfileRow> for FounderProfile {
    fn from(row: FounderProfileRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            user_id: parse_id(&row.user_id, "user_id", &row.id),
            niche_id: parse_id(&row.niche_id, "niche_id", &row.id),
            story_highlights: parse_list(&row.story_highlights, "story_highlights", &row.id),
            brand_name: row.brand_name,
            about_founder: row.about_founder,
            region: row.region,
            stats: FounderStats {
                story_count: count(row.story_count),
                followers_count: count(row.followers_count),
                profile_views: count(row.profile_views),
            },
            created_at: parse_ts(&row.created_at),
        }
    }
}

impl From<StoryRow> for Story {
    fn from(row: StoryRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            author_id: parse_id(&row.author_id, "author_id", &row.id),
            founder_profile_id: parse_id(&row.founder_profile_id, "founder_profile_id", &row.id),
            niche_id: parse_id(&row.niche_id, "niche_id", &row.id),
            media_urls: parse_list(&row.media_urls, "media_urls", &row.id),
            text: row.text,
            region: row.region,
            like_count: count(row.like_count),
            comment_count: count(row.comment_count),
            view_count: count(row.view_count),
            created_at: parse_ts(&row.created_at),
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            story_id: parse_id(&row.story_id, "story_id", &row.id),
            author_id: parse_id(&row.author_id, "author_id", &row.id),
            text: row.text,
            created_at: parse_ts(&row.created_at),
        }
    }
}

impl From<EventRow> for ActivityEvent {
    fn from(row: EventRow) -> Self {
        Self {
            id: parse_id(&row.id, "id", &row.id),
            user_id: row.user_id.as_deref().map(|u| parse_id(u, "user_id", &row.id)),
            target_id: row.target_id.as_deref().map(|t| parse_id(t, "target_id", &row.id)),
            metadata: row.metadata.as_deref().and_then(|m| {
                serde_json::from_str(m)
                    .map_err(|e| warn!("Corrupt metadata on event '{}': {}", row.id, e))
                    .ok()
            }),
            kind: row.kind,
            created_at: parse_ts(&row.created_at),
        }
    }
}
