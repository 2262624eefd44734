use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{FounderProfile, Niche, TrendingGroup};

// -- JWT Claims --

/// Claims issued by the identity provider. `sub` is trusted as the actor id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: usize,
}

// -- Pagination --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub total_pages: u32,
}

// -- Founders --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpsertFounderRequest {
    pub brand_name: Option<String>,
    pub about_founder: String,
    #[serde(default)]
    pub story_highlights: Vec<String>,
    pub niche_id: Uuid,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FounderSort {
    #[default]
    New,
    Top,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FounderFilter {
    pub niche_id: Option<Uuid>,
    pub region: Option<String>,
    #[serde(default)]
    pub sort: FounderSort,
}

// -- Stories --

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoryFilter {
    pub niche_id: Option<Uuid>,
    pub founder_profile_id: Option<Uuid>,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateStoryRequest {
    pub text: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub niche_id: Uuid,
    pub region: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub text: String,
}

// -- Events --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordEventRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub target_id: Option<Uuid>,
    pub metadata: Option<serde_json::Value>,
}

// -- Discover --

#[derive(Debug, Clone, Serialize)]
pub struct TrendingNiche {
    pub niche_id: Uuid,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub story_count: u64,
}

impl TrendingNiche {
    pub fn resolve(group: &TrendingGroup, niches: &[Niche]) -> Self {
        let niche = niches.iter().find(|n| n.id == group.group_key);
        Self {
            niche_id: group.group_key,
            name: niche.map(|n| n.name.clone()),
            slug: niche.map(|n| n.slug.clone()),
            story_count: group.count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DiscoverResponse {
    pub trending_founders: Vec<FounderProfile>,
    pub trending_niches: Vec<TrendingNiche>,
    pub recent_founders: Vec<FounderProfile>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    pub healed: Vec<(crate::models::CounterField, usize)>,
}

impl ReconcileReport {
    pub fn total(&self) -> usize {
        self.healed.iter().map(|(_, n)| n).sum()
    }
}
