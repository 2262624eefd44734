use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Founder,
    Supporter,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Founder => "founder",
            Self::Supporter => "supporter",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "founder" => Ok(Self::Founder),
            "supporter" => Ok(Self::Supporter),
            "admin" => Ok(Self::Admin),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// A content category stories and founders are filed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Niche {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FounderStats {
    pub story_count: u64,
    pub followers_count: u64,
    pub profile_views: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FounderProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub brand_name: Option<String>,
    pub about_founder: String,
    pub story_highlights: Vec<String>,
    pub niche_id: Uuid,
    pub region: Option<String>,
    pub stats: FounderStats,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: Uuid,
    pub author_id: Uuid,
    pub founder_profile_id: Uuid,
    pub text: String,
    pub media_urls: Vec<String>,
    pub niche_id: Uuid,
    pub region: Option<String>,
    pub like_count: u64,
    pub comment_count: u64,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub story_id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

// -- Relations --

/// The two kinds of actor -> target join records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// user -> founder profile
    Follow,
    /// user -> story
    Like,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Follow => "follow",
            Self::Like => "like",
        }
    }

    /// Entity type a relation of this kind must point at.
    pub fn target(&self) -> CountableKind {
        match self {
            Self::Follow => CountableKind::FounderProfile,
            Self::Like => CountableKind::Story,
        }
    }

    /// Counter on the target that mirrors the number of live relations.
    pub fn counter(&self) -> CounterField {
        match self {
            Self::Follow => CounterField::FollowersCount,
            Self::Like => CounterField::LikeCount,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRelationKind(pub String);

impl fmt::Display for UnknownRelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown relation kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownRelationKind {}

impl FromStr for RelationKind {
    type Err = UnknownRelationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "follow" => Ok(Self::Follow),
            "like" => Ok(Self::Like),
            _ => Err(UnknownRelationKind(s.to_string())),
        }
    }
}

/// Requested end state of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationState {
    pub active: bool,
}

// -- Counters --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountableKind {
    FounderProfile,
    Story,
}

impl CountableKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FounderProfile => "founder_profile",
            Self::Story => "story",
        }
    }
}

impl FromStr for CountableKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "founder" | "founders" | "founder_profile" => Ok(Self::FounderProfile),
            "story" | "stories" => Ok(Self::Story),
            other => Err(other.to_string()),
        }
    }
}

/// Every denormalized counter the engine maintains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    FollowersCount,
    StoryCount,
    ProfileViews,
    LikeCount,
    CommentCount,
    ViewCount,
}

impl CounterField {
    pub const ALL: [CounterField; 6] = [
        Self::FollowersCount,
        Self::StoryCount,
        Self::ProfileViews,
        Self::LikeCount,
        Self::CommentCount,
        Self::ViewCount,
    ];

    pub fn owner(&self) -> CountableKind {
        match self {
            Self::FollowersCount | Self::StoryCount | Self::ProfileViews => {
                CountableKind::FounderProfile
            }
            Self::LikeCount | Self::CommentCount | Self::ViewCount => CountableKind::Story,
        }
    }

    /// Whether the counter mirrors a set of live records and can therefore be
    /// recomputed. View counters have no backing records.
    pub fn is_derived(&self) -> bool {
        !matches!(self, Self::ProfileViews | Self::ViewCount)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FollowersCount => "followers_count",
            Self::StoryCount => "story_count",
            Self::ProfileViews => "profile_views",
            Self::LikeCount => "like_count",
            Self::CommentCount => "comment_count",
            Self::ViewCount => "view_count",
        }
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// -- Trending --

/// Content stream plus grouping key used for recent-activity ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendingKind {
    StoriesByNiche,
    StoriesByFounder,
    CommentsByStory,
}

impl FromStr for TrendingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stories_by_niche" => Ok(Self::StoriesByNiche),
            "stories_by_founder" => Ok(Self::StoriesByFounder),
            "comments_by_story" => Ok(Self::CommentsByStory),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendingGroup {
    pub group_key: Uuid,
    pub count: u64,
    pub latest_at: DateTime<Utc>,
}

/// Result row of a popularity ranking.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum PopularEntity {
    FounderProfile(FounderProfile),
    Story(Story),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_kind_parse() {
        assert_eq!("follow".parse::<RelationKind>(), Ok(RelationKind::Follow));
        assert_eq!(" Like ".parse::<RelationKind>(), Ok(RelationKind::Like));
        assert!("block".parse::<RelationKind>().is_err());
    }

    #[test]
    fn test_relation_kind_targets() {
        assert_eq!(RelationKind::Follow.target(), CountableKind::FounderProfile);
        assert_eq!(RelationKind::Like.counter(), CounterField::LikeCount);
        assert_eq!(RelationKind::Like.counter().owner(), RelationKind::Like.target());
        assert_eq!(RelationKind::Follow.counter().owner(), RelationKind::Follow.target());
    }

    #[test]
    fn test_trending_kind_parse_full_names_only() {
        assert_eq!(
            "stories_by_founder".parse::<TrendingKind>(),
            Ok(TrendingKind::StoriesByFounder)
        );
        assert_eq!("comments_by_story".parse::<TrendingKind>(), Ok(TrendingKind::CommentsByStory));
        for alias in ["niches", "founders", "stories"] {
            assert!(alias.parse::<TrendingKind>().is_err(), "{}", alias);
        }
    }

    #[test]
    fn test_view_counters_not_derived() {
        let derived: Vec<_> = CounterField::ALL.iter().filter(|f| f.is_derived()).collect();
        assert_eq!(derived.len(), 4);
        assert!(!CounterField::ViewCount.is_derived());
    }
}
