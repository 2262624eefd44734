use axum::{
    Json, Router, middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use founderhub_api::middleware::{optional_auth, require_auth};
use founderhub_api::{AppState, admin, discover, events, founders, relations, stories};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/stories", get(stories::list_stories))
        .route("/stories/{id}/comments", get(stories::list_comments))
        .route("/founders", get(founders::list_founders))
        .route("/discover", get(discover::discover))
        .route("/trending", get(discover::trending))
        .route("/popular", get(discover::popular))
        .route("/health", get(health));

    let viewer_routes = Router::new()
        .route("/stories/{id}", get(stories::get_story))
        .route("/founders/{id}", get(founders::get_founder))
        .route("/events", post(events::record_event))
        .layer(middleware::from_fn_with_state(state.clone(), optional_auth));

    let protected_routes = Router::new()
        .route("/follow/{founder_id}", post(relations::follow).delete(relations::unfollow))
        .route("/stories/{id}/like", post(relations::like).delete(relations::unlike))
        .route("/stories", post(stories::create_story))
        .route("/stories/{id}/comments", post(stories::create_comment))
        .route("/founders", post(founders::upsert_founder))
        .route("/admin/reconcile", post(admin::reconcile))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    use founderhub_api::AppStateInner;
    use founderhub_db::Database;
    use founderhub_social::{EngineConfig, SocialEngine};
    use founderhub_types::api::{Claims, UpsertFounderRequest};
    use founderhub_types::models::UserRole;

    use super::*;

    const SECRET: &str = "router-test-secret";

    struct Fixture {
        app: Router,
        fan: Uuid,
        founder_profile: Uuid,
    }

    fn fixture() -> Fixture {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = chrono::Utc::now();
        let (owner, fan, niche) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        db.create_user(owner, "Owner", UserRole::Founder, now).unwrap();
        db.create_user(fan, "Fan", UserRole::Supporter, now).unwrap();
        db.create_niche(niche, "SaaS", "saas", now).unwrap();
        let profile = db
            .upsert_founder_profile(
                Uuid::new_v4(),
                owner,
                &UpsertFounderRequest {
                    brand_name: None,
                    about_founder: "Bootstrapped".into(),
                    story_highlights: vec![],
                    niche_id: niche,
                    region: None,
                },
                now,
            )
            .unwrap();

        let engine = SocialEngine::start(db, EngineConfig::default());
        let state = Arc::new(AppStateInner {
            engine,
            jwt_secret: SECRET.into(),
        });

        Fixture {
            app: router(state),
            fan,
            founder_profile: profile.id,
        }
    }

    fn bearer(user: Uuid) -> String {
        let claims = Claims {
            sub: user,
            exp: (chrono::Utc::now() + chrono::Duration::hours(1)).timestamp() as usize,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {}", token)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        auth: Option<String>) -> (StatusCode, Value,
    ) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(header::AUTHORIZATION, auth);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_follow_round_trip_over_http() {
        let f = fixture();
        let uri = format!("/follow/{}", f.founder_profile);

        let (status, body) = send(&f.app, "POST", &uri, Some(bearer(f.fan))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], true);

        let (_, body) = send(&f.app, "POST", &uri, Some(bearer(f.fan))).await;
        assert_eq!(body["active"], true);

        let (_, founder) = send(
            &f.app,
            "GET",
            &format!("/founders/{}", f.founder_profile),
            None,
        )
        .await;
        assert_eq!(founder["stats"]["followers_count"], 1);

        let (status, body) = send(&f.app, "DELETE", &uri, Some(bearer(f.fan))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["active"], false);
    }

    #[tokio::test]
    async fn test_auth_and_error_statuses() {
        let f = fixture();
        let uri = format!("/follow/{}", f.founder_profile);

        let (status, _) = send(&f.app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &f.app,
            "POST",
            &format!("/follow/{}", Uuid::new_v4()),
            Some(bearer(f.fan)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("not found"));

        let (status, _) = send(&f.app, "POST", "/admin/reconcile", Some(bearer(f.fan))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&f.app, "GET", "/trending?kind=galaxies", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_bad_token_reads_as_anonymous() {
        let f = fixture();
        let stale = Some("Bearer not-a-jwt".to_string());

        let (status, body) = send(
            &f.app,
            "GET",
            &format!("/founders/{}", f.founder_profile),
            stale.clone(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stats"]["profile_views"], 1);

        let (status, _) = send(
            &f.app,
            "POST",
            &format!("/follow/{}", f.founder_profile),
            stale,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_public_listings() {
        let f = fixture();

        let (status, body) = send(&f.app, "GET", "/stories?limit=500", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_pages"], 1);
        assert_eq!(body["page"], 1);

        let (status, body) = send(&f.app, "GET", "/popular?kind=founders", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["kind"], "founder_profile");

        let (status, body) = send(&f.app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
