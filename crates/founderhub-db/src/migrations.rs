use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                display_name    TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'supporter',
                created_at      TEXT NOT NULL
            );

            CREATE TABLE niches (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                slug        TEXT NOT NULL UNIQUE,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE founder_profiles (
                id                  TEXT PRIMARY KEY,
                user_id             TEXT NOT NULL UNIQUE REFERENCES users(id),
                brand_name          TEXT,
                about_founder       TEXT NOT NULL,
                story_highlights    TEXT NOT NULL DEFAULT '[]',
                niche_id            TEXT NOT NULL REFERENCES niches(id),
                region              TEXT,
                story_count         INTEGER NOT NULL DEFAULT 0 CHECK (story_count >= 0),
                followers_count     INTEGER NOT NULL DEFAULT 0 CHECK (followers_count >= 0),
                profile_views       INTEGER NOT NULL DEFAULT 0 CHECK (profile_views >= 0),
                created_at          TEXT NOT NULL,
                updated_at          TEXT NOT NULL
            );

            CREATE INDEX idx_founders_created ON founder_profiles(created_at);

            CREATE TABLE stories (
                id                  TEXT PRIMARY KEY,
                author_id           TEXT NOT NULL REFERENCES users(id),
                founder_profile_id  TEXT NOT NULL REFERENCES founder_profiles(id),
                text                TEXT NOT NULL,
                media_urls          TEXT NOT NULL DEFAULT '[]',
                niche_id            TEXT NOT NULL REFERENCES niches(id),
                region              TEXT,
                like_count          INTEGER NOT NULL DEFAULT 0 CHECK (like_count >= 0),
                comment_count       INTEGER NOT NULL DEFAULT 0 CHECK (comment_count >= 0),
                view_count          INTEGER NOT NULL DEFAULT 0 CHECK (view_count >= 0),
                created_at          TEXT NOT NULL
            );

            CREATE INDEX idx_stories_created ON stories(created_at);
            CREATE INDEX idx_stories_founder ON stories(founder_profile_id, created_at);
            CREATE INDEX idx_stories_niche ON stories(niche_id, created_at);

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                story_id    TEXT NOT NULL REFERENCES stories(id),
                author_id   TEXT NOT NULL REFERENCES users(id),
                text        TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_story ON comments(story_id, created_at);

            -- The primary key is the uniqueness constraint that serializes
            -- concurrent toggles of the same tuple.
            CREATE TABLE relations (
                actor_id    TEXT NOT NULL REFERENCES users(id),
                target_id   TEXT NOT NULL,
                kind        TEXT NOT NULL CHECK (kind IN ('follow', 'like')),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (actor_id, target_id, kind)
            );

            CREATE INDEX idx_relations_target ON relations(target_id, kind);

            CREATE TABLE events (
                id          TEXT PRIMARY KEY,
                user_id     TEXT,
                kind        TEXT NOT NULL,
                target_id   TEXT,
                metadata    TEXT,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_events_kind_target ON events(kind, target_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_rerunnable() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
