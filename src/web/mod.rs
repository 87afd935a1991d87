//! HTTP interface - axum router, shared state and server startup.
//!
//! Handlers are thin: they pull the caller and input out of the request, call one
//! `core` operation and serialize its result. Identity comes from the `X-User-Id`
//! header set by the authenticating proxy in front of this service.

/// Error to response mapping
pub mod error;
/// Request extractors for the caller identity and request flavour
pub mod extractors;
mod handlers;

use crate::{config::AppConfig, errors::Result};
use axum::{
    Router,
    routing::{delete, get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// State shared by every handler
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Loaded settings
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Bundles a connection and settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Accounts and inbox
        .route("/users", post(handlers::users::register))
        .route(
            "/users/me",
            get(handlers::users::me).put(handlers::users::update_me),
        )
        .route("/notifications", get(handlers::notifications::list))
        .route("/notifications/unread", get(handlers::notifications::unread))
        // Campaign catalog
        .route("/categories", get(handlers::campaigns::categories))
        .route(
            "/campaigns",
            get(handlers::campaigns::list).post(handlers::campaigns::create),
        )
        .route("/campaigns/:id", get(handlers::campaigns::detail))
        .route("/campaigns/:id/image", put(handlers::campaigns::set_image))
        .route(
            "/campaigns/:id/donate-qr",
            put(handlers::campaigns::set_donate_qr),
        )
        .route("/campaigns/:id/updates", post(handlers::campaigns::add_update))
        .route(
            "/campaigns/:id/updates/:update_id",
            get(handlers::campaigns::update_detail),
        )
        .route("/campaigns/:id/events", post(handlers::campaigns::create_event))
        .route(
            "/campaigns/:id/events/:event_id",
            get(handlers::campaigns::event_detail),
        )
        // Donations
        .route("/campaigns/:id/donations", post(handlers::donations::submit))
        .route(
            "/campaigns/:id/donations/pending",
            get(handlers::donations::pending),
        )
        .route("/donations/mine", get(handlers::donations::mine))
        .route("/donations/:id/approve", post(handlers::donations::approve))
        .route("/donations/:id/reject", post(handlers::donations::reject))
        // Donor groups
        .route(
            "/groups",
            get(handlers::groups::list).post(handlers::groups::create),
        )
        .route("/groups/mine", get(handlers::groups::mine))
        .route("/groups/join", post(handlers::groups::join))
        .route("/groups/:id", get(handlers::groups::detail))
        .route("/groups/:id/leave", post(handlers::groups::leave))
        .route("/groups/:id/members", post(handlers::groups::add_member))
        .route(
            "/groups/:id/members/:user_id",
            delete(handlers::groups::remove_member),
        )
        .route(
            "/groups/:id/messages",
            get(handlers::messages::list).post(handlers::messages::post),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds the configured address and serves until the process ends.
pub async fn serve(state: AppState) -> Result<()> {
    let address = state.config.server.bind_address.clone();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!("Listening on {}", address);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
