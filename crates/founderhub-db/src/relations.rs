use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension, params};
use uuid::Uuid;

use founderhub_types::models::{CountableKind, CounterField, RelationKind};

use crate::{Database, fmt_ts};

/// Table and column that hold a counter.
fn counter_location(field: CounterField) -> (&'static str, &'static str) {
    let table = table_for(field.owner());
    (table, field.as_str())
}

pub(crate) fn table_for(kind: CountableKind) -> &'static str {
    match kind {
        CountableKind::FounderProfile => "founder_profiles",
        CountableKind::Story => "stories",
    }
}

/// Correlated subquery counting the live records behind a derived counter.
/// `t` is the alias of the owning table.
fn counter_source(field: CounterField) -> Option<&'static str> {
    match field {
        CounterField::FollowersCount => {
            Some("SELECT COUNT(*) FROM relations r WHERE r.target_id = t.id AND r.kind = 'follow'")
        }
        CounterField::LikeCount => {
            Some("SELECT COUNT(*) FROM relations r WHERE r.target_id = t.id AND r.kind = 'like'")
        }
        CounterField::StoryCount => {
            Some("SELECT COUNT(*) FROM stories s WHERE s.founder_profile_id = t.id")
        }
        CounterField::CommentCount => {
            Some("SELECT COUNT(*) FROM comments c WHERE c.story_id = t.id")
        }
        CounterField::ProfileViews | CounterField::ViewCount => None,
    }
}

impl Database {
    // -- Relations --

    /// Insert the (actor, target, kind) tuple unless it already exists.
    /// Returns true only when this call created the record.
    pub fn insert_relation_if_absent(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
        created_at: DateTime<Utc>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO relations (actor_id, target_id, kind, created_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(actor_id, target_id, kind) DO NOTHING",
                params![
                    actor_id.to_string(),
                    target_id.to_string(),
                    kind.as_str(),
                    fmt_ts(&created_at)
                ],
            )?;
            Ok(inserted == 1)
        })
    }

    /// Delete the tuple if present. Returns true only when this call removed it.
    pub fn delete_relation_if_present(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn.execute(
                "DELETE FROM relations WHERE actor_id = ?1 AND target_id = ?2 AND kind = ?3",
                params![actor_id.to_string(), target_id.to_string(), kind.as_str()],
            )?;
            Ok(deleted == 1)
        })
    }

    pub fn relation_exists(
        &self,
        actor_id: Uuid,
        target_id: Uuid,
        kind: RelationKind,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let found: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM relations WHERE actor_id = ?1 AND target_id = ?2 AND kind = ?3)",
                params![actor_id.to_string(), target_id.to_string(), kind.as_str()],
                |r| r.get(0),
            )?;
            Ok(found)
        })
    }

    pub fn count_relations(&self, target_id: Uuid, kind: RelationKind) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM relations WHERE target_id = ?1 AND kind = ?2",
                params![target_id.to_string(), kind.as_str()],
                |r| r.get(0),
            )?;
            Ok(n as u64)
        })
    }

    pub fn entity_exists(&self, kind: CountableKind, id: Uuid) -> Result<bool> {
        match kind {
            CountableKind::FounderProfile => self.founder_exists(id),
            CountableKind::Story => self.story_exists(id),
        }
    }

    // -- Counters --

    /// Add `delta` to a counter in one statement, flooring the result at zero.
    /// Returns the new value, or None when the entity does not exist.
    pub fn adjust_counter(
        &self,
        entity_id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<Option<u64>> {
        let (table, column) = counter_location(field);
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE {table} SET {column} = MAX({column} + ?1, 0) WHERE id = ?2 RETURNING {column}"
            );
            let value: Option<i64> = conn
                .query_row(&sql, params![delta, entity_id.to_string()], |r| r.get(0))
                .optional()?;
            Ok(value.map(|v| v as u64))
        })
    }

    pub fn get_counter(&self, entity_id: Uuid, field: CounterField) -> Result<Option<u64>> {
        let (table, column) = counter_location(field);
        self.with_conn(|conn| {
            let sql = format!("SELECT {column} FROM {table} WHERE id = ?1");
            let value: Option<i64> = conn
                .query_row(&sql, [entity_id.to_string()], |r| r.get(0))
                .optional()?;
            Ok(value.map(|v| v as u64))
        })
    }

    /// Recompute a derived counter for every entity whose cached value differs
    /// from its live record count. Returns the number of rows healed.
    pub fn recompute_counter(&self, field: CounterField) -> Result<usize> {
        let Some(source) = counter_source(field) else {
            return Ok(0);
        };
        let (table, column) = counter_location(field);
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE {table} AS t SET {column} = ({source}) WHERE {column} != ({source})"
            );
            Ok(conn.execute(&sql, [])?)
        })
    }

    /// Recompute a derived counter for a single entity. Returns the healed
    /// value, or None when the entity is gone or the counter is not derived.
    pub fn recompute_counter_for(
        &self,
        entity_id: Uuid,
        field: CounterField,
    ) -> Result<Option<u64>> {
        let Some(source) = counter_source(field) else {
            return Ok(None);
        };
        let (table, column) = counter_location(field);
        self.with_conn_mut(|conn| {
            let sql = format!(
                "UPDATE {table} AS t SET {column} = ({source}) WHERE t.id = ?1 RETURNING {column}"
            );
            let value: Option<i64> = conn
                .query_row(&sql, [entity_id.to_string()], |r| r.get(0))
                .optional()?;
            Ok(value.map(|v| v as u64))
        })
    }

    /// Overwrite a counter. Only used to simulate drift in tests and tooling;
    /// the engine never writes client-supplied counter values.
    pub fn force_counter(&self, entity_id: Uuid, field: CounterField, value: u64) -> Result<bool> {
        let (table, column) = counter_location(field);
        self.with_conn_mut(|conn| {
            let sql = format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2");
            let n = conn.execute(&sql, params![value as i64, entity_id.to_string()])?;
            Ok(n == 1)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::NewStory;
    use founderhub_types::api::UpsertFounderRequest;
    use founderhub_types::models::UserRole;

    struct Fixture {
        db: Database,
        fan: Uuid,
        founder_profile: Uuid,
        story: Uuid,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let fan = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let niche = Uuid::new_v4();
        db.create_user(fan, "Fan", UserRole::Supporter, now).unwrap();
        db.create_user(owner, "Owner", UserRole::Founder, now).unwrap();
        db.create_niche(niche, "Climate", "climate", now).unwrap();
        let profile = db
            .upsert_founder_profile(
                Uuid::new_v4(),
                owner,
                &UpsertFounderRequest {
                    brand_name: None,
                    about_founder: "about".into(),
                    story_highlights: vec![],
                    niche_id: niche,
                    region: None,
                },
                now,
            )
            .unwrap();
        let story = db
            .insert_story(&NewStory {
                id: Uuid::new_v4(),
                author_id: owner,
                founder_profile_id: profile.id,
                text: "hello".into(),
                media_urls: vec![],
                niche_id: niche,
                region: None,
                created_at: now,
            })
            .unwrap();

        Fixture {
            db,
            fan,
            founder_profile: profile.id,
            story: story.id,
        }
    }

    #[test]
    fn test_insert_if_absent_reports_creation_once() {
        let f = fixture();
        let now = Utc::now();
        let insert = |kind| {
            f.db.insert_relation_if_absent(f.fan, f.founder_profile, kind, now)
                .unwrap()
        };
        assert!(insert(RelationKind::Follow));
        assert!(!insert(RelationKind::Follow));
        // Same pair, different kind is a distinct tuple
        assert!(insert(RelationKind::Like));
        assert_eq!(f.db.count_relations(f.founder_profile, RelationKind::Follow).unwrap(), 1);
    }

    #[test]
    fn test_delete_if_present_reports_removal_once() {
        let f = fixture();
        f.db.insert_relation_if_absent(f.fan, f.story, RelationKind::Like, Utc::now()).unwrap();
        assert!(f.db.delete_relation_if_present(f.fan, f.story, RelationKind::Like).unwrap());
        assert!(!f.db.delete_relation_if_present(f.fan, f.story, RelationKind::Like).unwrap());
        assert!(!f.db.relation_exists(f.fan, f.story, RelationKind::Like).unwrap());
    }

    #[test]
    fn test_adjust_counter_floors_at_zero() {
        let f = fixture();
        assert_eq!(f.db.adjust_counter(f.story, CounterField::LikeCount, -1).unwrap(), Some(0));
        assert_eq!(f.db.adjust_counter(f.story, CounterField::LikeCount, 1).unwrap(), Some(1));
        assert_eq!(f.db.adjust_counter(f.story, CounterField::LikeCount, -1).unwrap(), Some(0));
        assert_eq!(f.db.adjust_counter(f.story, CounterField::LikeCount, -1).unwrap(), Some(0));
    }

    #[test]
    fn test_adjust_counter_on_missing_entity() {
        let f = fixture();
        let missing = Uuid::new_v4();
        assert_eq!(f.db.adjust_counter(missing, CounterField::FollowersCount, 1).unwrap(), None);
    }

    #[test]
    fn test_recompute_heals_drift() {
        let f = fixture();
        f.db.insert_relation_if_absent(f.fan, f.founder_profile, RelationKind::Follow, Utc::now())
            .unwrap();
        f.db.force_counter(f.founder_profile, CounterField::FollowersCount, 7).unwrap();
        f.db.force_counter(f.founder_profile, CounterField::StoryCount, 0).unwrap();

        assert_eq!(f.db.recompute_counter(CounterField::FollowersCount).unwrap(), 1);
        assert_eq!(f.db.recompute_counter(CounterField::FollowersCount).unwrap(), 0);
        assert_eq!(
            f.db.get_counter(f.founder_profile, CounterField::FollowersCount).unwrap(),
            Some(1)
        );

        assert_eq!(
            f.db.recompute_counter_for(f.founder_profile, CounterField::StoryCount).unwrap(),
            Some(1)
        );
        assert_eq!(f.db.recompute_counter(CounterField::ViewCount).unwrap(), 0);
    }
}
