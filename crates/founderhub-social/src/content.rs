use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use founderhub_db::Database;
use founderhub_db::queries::NewStory;
use founderhub_types::api::{CreateStoryRequest, UpsertFounderRequest};
use founderhub_types::models::{Comment, CounterField, FounderProfile, Niche, Story, User, UserRole};

use crate::counters::CounterSynchronizer;
use crate::error::{SocialError, SocialResult};
use crate::store::{SocialStore, blocking};

const MAX_STORY_LEN: usize = 5000;
const MAX_COMMENT_LEN: usize = 2000;

/// Content writes whose creation moves a parent counter (stories, comments)
/// plus the plain records they hang off.
pub struct ContentService<S> {
    db: Arc<Database>,
    counters: CounterSynchronizer<S>,
}

impl<S> Clone for ContentService<S> {
    fn clone(&self) -> Self {
        Self {
            db: Arc::clone(&self.db),
            counters: self.counters.clone(),
        }
    }
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug.len() <= 64
        && slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
}

impl<S: SocialStore> ContentService<S> {
    pub fn new(db: Arc<Database>, counters: CounterSynchronizer<S>) -> Self {
        Self { db, counters }
    }

    /// Provision a user. Normally done by the identity collaborator.
    pub async fn create_user(&self, display_name: &str, role: UserRole) -> SocialResult<User> {
        let name = display_name.trim().to_string();
        if name.is_empty() {
            return Err(SocialError::InvalidInput("display name must not be empty".into()));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let stored = name.clone();
        blocking(&self.db, move |db| db.create_user(id, &stored, role, now)).await?;

        Ok(User {
            id,
            display_name: name,
            role,
            created_at: now,
        })
    }

    pub async fn create_niche(&self, name: &str, slug: &str) -> SocialResult<Niche> {
        let name = name.trim().to_string();
        let slug = slug.trim().to_lowercase();
        if name.is_empty() {
            return Err(SocialError::InvalidInput("niche name must not be empty".into()));
        }
        if !valid_slug(&slug) {
            return Err(SocialError::InvalidInput(format!("invalid niche slug '{}'", slug)));
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        let (n, s) = (name.clone(), slug.clone());
        blocking(&self.db, move |db| db.create_niche(id, &n, &s, now)).await?;

        Ok(Niche {
            id,
            name,
            slug,
            created_at: now,
        })
    }

    pub async fn get_user(&self, user_id: Uuid) -> SocialResult<User> {
        blocking(&self.db, move |db| db.get_user(user_id))
            .await?
            .ok_or_else(|| SocialError::not_found("user", user_id))
    }

    async fn require_niche(&self, niche_id: Uuid) -> SocialResult<()> {
        if blocking(&self.db, move |db| db.niche_exists(niche_id)).await? {
            Ok(())
        } else {
            Err(SocialError::not_found("niche", niche_id))
        }
    }

    /// Create or update the caller's founder profile. Counters are untouched.
    pub async fn upsert_founder(
        &self,
        user_id: Uuid,
        req: UpsertFounderRequest,
    ) -> SocialResult<FounderProfile> {
        let user = self.get_user(user_id).await?;
        if user.role != UserRole::Founder {
            return Err(SocialError::Forbidden("only founders can have a founder profile".into()));
        }
        if req.about_founder.trim().is_empty() {
            return Err(SocialError::InvalidInput("about_founder must not be empty".into()));
        }
        self.require_niche(req.niche_id).await?;

        let profile = blocking(&self.db, move |db| {
            db.upsert_founder_profile(Uuid::new_v4(), user_id, &req, Utc::now())
        })
        .await?;
        info!("Founder profile {} saved for {}", profile.id, user_id);
        Ok(profile)
    }

    /// Post a story under the author's founder profile and bump its story count.
    pub async fn create_story(
        &self,
        author_id: Uuid,
        req: CreateStoryRequest,
    ) -> SocialResult<Story> {
        let user = self.get_user(author_id).await?;
        if user.role != UserRole::Founder {
            return Err(SocialError::Forbidden("only founders can post stories".into()));
        }

        let text = req.text.trim().to_string();
        if text.is_empty() {
            return Err(SocialError::InvalidInput("story text must not be empty".into()));
        }
        if text.chars().count() > MAX_STORY_LEN {
            return Err(SocialError::InvalidInput(format!(
                "story text exceeds {} characters",
                MAX_STORY_LEN
            )));
        }
        self.require_niche(req.niche_id).await?;

        let profile = blocking(&self.db, move |db| db.get_founder_by_user(author_id))
            .await?
            .ok_or_else(|| SocialError::not_found("founder profile", author_id))?;

        let new_story = NewStory {
            id: Uuid::new_v4(),
            author_id,
            founder_profile_id: profile.id,
            text,
            media_urls: req.media_urls,
            niche_id: req.niche_id,
            region: req.region.or(profile.region),
            created_at: Utc::now(),
        };
        let story = blocking(&self.db, move |db| db.insert_story(&new_story)).await?;
        info!("Story {} posted by {}", story.id, author_id);

        self.counters
            .adjust_or_defer(profile.id, CounterField::StoryCount, 1)
            .await;
        Ok(story)
    }

    /// Comment on a story and bump its comment count.
    pub async fn add_comment(
        &self,
        author_id: Uuid,
        story_id: Uuid,
        text: &str,
    ) -> SocialResult<Comment> {
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(SocialError::InvalidInput("comment text must not be empty".into()));
        }
        if text.chars().count() > MAX_COMMENT_LEN {
            return Err(SocialError::InvalidInput(format!(
                "comment exceeds {} characters",
                MAX_COMMENT_LEN
            )));
        }

        let (user_ok, story_ok) = blocking(&self.db, move |db| {
            Ok((db.user_exists(author_id)?, db.story_exists(story_id)?))
        })
        .await?;
        if !user_ok {
            return Err(SocialError::not_found("user", author_id));
        }
        if !story_ok {
            return Err(SocialError::not_found("story", story_id));
        }

        let comment = blocking(&self.db, move |db| {
            db.insert_comment(Uuid::new_v4(), story_id, author_id, &text, Utc::now())
        })
        .await?;

        self.counters
            .adjust_or_defer(story_id, CounterField::CommentCount, 1)
            .await;
        Ok(comment)
    }
}
