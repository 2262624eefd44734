use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use founderhub_types::api::{FounderFilter, FounderSort, StoryFilter, UpsertFounderRequest};
use founderhub_types::events::ActivityEvent;
use founderhub_types::models::{Comment, FounderProfile, Niche, Story, User, UserRole};

use crate::models::{CommentRow, EventRow, FounderProfileRow, NicheRow, StoryRow, UserRow};
use crate::{Database, fmt_ts};

pub(crate) const FOUNDER_COLUMNS: &str = "id, user_id, brand_name, about_founder, story_highlights, niche_id, \
     region, story_count, followers_count, profile_views, created_at";

pub(crate) const STORY_COLUMNS: &str = "id, author_id, founder_profile_id, text, media_urls, niche_id, region, \
     like_count, comment_count, view_count, created_at";

/// Fields of a story about to be written. Counters always start at zero.
pub struct NewStory {
    pub id: Uuid,
    pub author_id: Uuid,
    pub founder_profile_id: Uuid,
    pub text: String,
    pub media_urls: Vec<String>,
    pub niche_id: Uuid,
    pub region: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Database {
    // -- Users --

    pub fn create_user(
        &self,
        id: Uuid,
        display_name: &str,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (id, display_name, role, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), display_name, role.as_str(), fmt_ts(&created_at)],
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, display_name, role, created_at FROM users WHERE id = ?1",
                    [id.to_string()],
                    |row| {
                        Ok(UserRow {
                            id: row.get(0)?,
                            display_name: row.get(1)?,
                            role: row.get(2)?,
                            created_at: row.get(3)?,
                        })
                    },
                )
                .optional()?;
            Ok(row.map(User::from))
        })
    }

    pub fn user_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "users", id))
    }

    // -- Niches --

    pub fn create_niche(
        &self,
        id: Uuid,
        name: &str,
        slug: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO niches (id, name, slug, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id.to_string(), name, slug.to_lowercase(), fmt_ts(&created_at)],
            )?;
            Ok(())
        })
    }

    pub fn niche_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "niches", id))
    }

    /// Batch-fetch niches for a set of ids.
    pub fn get_niches_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Niche>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, name, slug, created_at FROM niches WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter().map(|id| id.to_string())), |row| {
                    Ok(NicheRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(Niche::from).collect())
        })
    }

    // -- Founder profiles --

    /// Create or update the profile owned by `user_id`. `new_id` is only used
    /// when no profile exists yet; counters are never touched here.
    pub fn upsert_founder_profile(
        &self,
        new_id: Uuid,
        user_id: Uuid,
        req: &UpsertFounderRequest,
        now: DateTime<Utc>,
    ) -> Result<FounderProfile> {
        let highlights = serde_json::to_string(&req.story_highlights)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO founder_profiles
                    (id, user_id, brand_name, about_founder, story_highlights, niche_id, region, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                 ON CONFLICT(user_id) DO UPDATE SET
                    brand_name = excluded.brand_name,
                    about_founder = excluded.about_founder,
                    story_highlights = excluded.story_highlights,
                    niche_id = excluded.niche_id,
                    region = excluded.region,
                    updated_at = excluded.updated_at",
                params![
                    new_id.to_string(),
                    user_id.to_string(),
                    req.brand_name,
                    req.about_founder,
                    highlights,
                    req.niche_id.to_string(),
                    req.region,
                    fmt_ts(&now),
                ],
            )?;

            let sql = format!(
                "SELECT {} FROM founder_profiles WHERE user_id = ?1",
                FOUNDER_COLUMNS
            );
            let row = conn.query_row(&sql, [user_id.to_string()], founder_row)?;
            Ok(FounderProfile::from(row))
        })
    }

    pub fn get_founder_profile(&self, id: Uuid) -> Result<Option<FounderProfile>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM founder_profiles WHERE id = ?1", FOUNDER_COLUMNS);
            let row = conn.query_row(&sql, [id.to_string()], founder_row).optional()?;
            Ok(row.map(FounderProfile::from))
        })
    }

    pub fn get_founder_by_user(&self, user_id: Uuid) -> Result<Option<FounderProfile>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM founder_profiles WHERE user_id = ?1",
                FOUNDER_COLUMNS
            );
            let row = conn.query_row(&sql, [user_id.to_string()], founder_row).optional()?;
            Ok(row.map(FounderProfile::from))
        })
    }

    pub fn founder_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "founder_profiles", id))
    }

    pub fn list_founders(
        &self,
        filter: &FounderFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<FounderProfile>> {
        self.with_conn(|conn| {
            let (where_sql, mut values) = founder_where(filter);
            let order = match filter.sort {
                FounderSort::New => "created_at DESC, id ASC",
                FounderSort::Top => POPULAR_FOUNDER_ORDER,
            };
            values.push(Value::Integer(i64::from(limit)));
            values.push(Value::Integer(offset as i64));
            let sql = format!(
                "SELECT {} FROM founder_profiles{} ORDER BY {} LIMIT ?{} OFFSET ?{}",
                FOUNDER_COLUMNS,
                where_sql,
                order,
                values.len() - 1,
                values.len()
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), founder_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(FounderProfile::from).collect())
        })
    }

    pub fn count_founders(&self, filter: &FounderFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (where_sql, values) = founder_where(filter);
            let sql = format!("SELECT COUNT(*) FROM founder_profiles{}", where_sql);
            let n: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    // -- Stories --

    pub fn insert_story(&self, story: &NewStory) -> Result<Story> {
        let media = serde_json::to_string(&story.media_urls)?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO stories
                    (id, author_id, founder_profile_id, text, media_urls, niche_id, region, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    story.id.to_string(),
                    story.author_id.to_string(),
                    story.founder_profile_id.to_string(),
                    story.text,
                    media,
                    story.niche_id.to_string(),
                    story.region,
                    fmt_ts(&story.created_at),
                ],
            )?;

            let sql = format!("SELECT {} FROM stories WHERE id = ?1", STORY_COLUMNS);
            let row = conn.query_row(&sql, [story.id.to_string()], story_row)?;
            Ok(Story::from(row))
        })
    }

    pub fn get_story(&self, id: Uuid) -> Result<Option<Story>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM stories WHERE id = ?1", STORY_COLUMNS);
            let row = conn.query_row(&sql, [id.to_string()], story_row).optional()?;
            Ok(row.map(Story::from))
        })
    }

    pub fn story_exists(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| exists(conn, "stories", id))
    }

    pub fn list_stories(
        &self,
        filter: &StoryFilter,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<Story>> {
        self.with_conn(|conn| {
            let (where_sql, mut values) = story_where(filter);
            values.push(Value::Integer(i64::from(limit)));
            values.push(Value::Integer(offset as i64));
            let sql = format!(
                "SELECT {} FROM stories{} ORDER BY created_at DESC, id ASC LIMIT ?{} OFFSET ?{}",
                STORY_COLUMNS,
                where_sql,
                values.len() - 1,
                values.len()
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), story_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows.into_iter().map(Story::from).collect())
        })
    }

    pub fn count_stories(&self, filter: &StoryFilter) -> Result<u64> {
        self.with_conn(|conn| {
            let (where_sql, values) = story_where(filter);
            let sql = format!("SELECT COUNT(*) FROM stories{}", where_sql);
            let n: i64 = conn.query_row(&sql, params_from_iter(values.iter()), |r| r.get(0))?;
            Ok(n as u64)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: Uuid,
        story_id: Uuid,
        author_id: Uuid,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Comment> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (id, story_id, author_id, text, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    id.to_string(),
                    story_id.to_string(),
                    author_id.to_string(),
                    text,
                    fmt_ts(&created_at)
                ],
            )?;
            Ok(())
        })?;

        Ok(Comment {
            id,
            story_id,
            author_id,
            text: text.to_string(),
            created_at,
        })
    }

    /// Comments of a story, oldest first.
    pub fn list_comments(&self, story_id: Uuid, limit: u32, offset: u64) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, story_id, author_id, text, created_at
                 FROM comments
                 WHERE story_id = ?1
                 ORDER BY created_at ASC, id ASC
                 LIMIT ?2 OFFSET ?3",
            )?;

            let rows = stmt
                .query_map(params![story_id.to_string(), limit, offset as i64], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        story_id: row.get(1)?,
                        author_id: row.get(2)?,
                        text: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(Comment::from).collect())
        })
    }

    pub fn count_comments(&self, story_id: Uuid) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM comments WHERE story_id = ?1",
                [story_id.to_string()],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    // -- Events --

    pub fn insert_event(&self, event: &ActivityEvent) -> Result<()> {
        let metadata = event.metadata.as_ref().map(serde_json::to_string).transpose()?;
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO events (id, user_id, kind, target_id, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.id.to_string(),
                    event.user_id.map(|u| u.to_string()),
                    event.kind,
                    event.target_id.map(|t| t.to_string()),
                    metadata,
                    fmt_ts(&event.created_at),
                ],
            )?;
            Ok(())
        })
    }

    pub fn count_events(&self, kind: &str, target_id: Option<Uuid>) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = match target_id {
                Some(target) => conn.query_row(
                    "SELECT COUNT(*) FROM events WHERE kind = ?1 AND target_id = ?2",
                    params![kind, target.to_string()],
                    |r| r.get(0),
                )?,
                None => conn.query_row("SELECT COUNT(*) FROM events WHERE kind = ?1", [kind], |r| {
                    r.get(0)
                })?,
            };
            Ok(n as u64)
        })
    }

    pub fn recent_events(&self, kind: &str, limit: u32) -> Result<Vec<ActivityEvent>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, kind, target_id, metadata, created_at
                 FROM events
                 WHERE kind = ?1
                 ORDER BY created_at DESC, id ASC
                 LIMIT ?2",
            )?;

            let rows = stmt
                .query_map(params![kind, limit], |row| {
                    Ok(EventRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        kind: row.get(2)?,
                        target_id: row.get(3)?,
                        metadata: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows.into_iter().map(ActivityEvent::from).collect())
        })
    }
}

pub(crate) const POPULAR_FOUNDER_ORDER: &str =
    "followers_count DESC, story_count DESC, created_at DESC, id ASC";

pub(crate) const POPULAR_STORY_ORDER: &str =
    "like_count DESC, comment_count DESC, created_at DESC, id ASC";

fn exists(conn: &Connection, table: &str, id: Uuid) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table);
    let found: bool = conn.query_row(&sql, [id.to_string()], |r| r.get(0))?;
    Ok(found)
}

fn founder_where(filter: &FounderFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(niche) = filter.niche_id {
        values.push(Value::Text(niche.to_string()));
        clauses.push(format!("niche_id = ?{}", values.len()));
    }
    if let Some(region) = &filter.region {
        values.push(Value::Text(region.clone()));
        clauses.push(format!("region = ?{}", values.len()));
    }
    (where_clause(&clauses), values)
}

fn story_where(filter: &StoryFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(niche) = filter.niche_id {
        values.push(Value::Text(niche.to_string()));
        clauses.push(format!("niche_id = ?{}", values.len()));
    }
    if let Some(founder) = filter.founder_profile_id {
        values.push(Value::Text(founder.to_string()));
        clauses.push(format!("founder_profile_id = ?{}", values.len()));
    }
    if let Some(region) = &filter.region {
        values.push(Value::Text(region.clone()));
        clauses.push(format!("region = ?{}", values.len()));
    }
    (where_clause(&clauses), values)
}

fn where_clause(clauses: &[String]) -> String {
    if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    }
}

pub(crate) fn founder_row(row: &Row<'_>) -> rusqlite::Result<FounderProfileRow> {
    Ok(FounderProfileRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        brand_name: row.get(2)?,
        about_founder: row.get(3)?,
        story_highlights: row.get(4)?,
        niche_id: row.get(5)?,
        region: row.get(6)?,
        story_count: row.get(7)?,
        followers_count: row.get(8)?,
        profile_views: row.get(9)?,
        created_at: row.get(10)?,
    })
}

pub(crate) fn story_row(row: &Row<'_>) -> rusqlite::Result<StoryRow> {
    Ok(StoryRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        founder_profile_id: row.get(2)?,
        text: row.get(3)?,
        media_urls: row.get(4)?,
        niche_id: row.get(5)?,
        region: row.get(6)?,
        like_count: row.get(7)?,
        comment_count: row.get(8)?,
        view_count: row.get(9)?,
        created_at: row.get(10)?,
    })
}
