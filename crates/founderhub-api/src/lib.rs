pub mod admin;
pub mod discover;
pub mod error;
pub mod events;
pub mod founders;
pub mod middleware;
pub mod relations;
pub mod stories;

use std::sync::Arc;

use founderhub_social::SocialEngine;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub engine: SocialEngine,
    pub jwt_secret: String,
}
