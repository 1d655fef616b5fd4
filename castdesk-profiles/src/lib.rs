//! castdesk-profiles library - profile reconciliation service
//!
//! Keeps flat profile rows and namespaced questionnaire documents consistent
//! and serves them over HTTP.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod fieldsets;
pub mod observe;
pub mod partition;
pub mod reconciler;

use observe::CountingObserver;
use reconciler::ProfileReconciler;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<ProfileReconciler>,
    /// Outcome counters fed by the reconciler
    pub metrics: Arc<CountingObserver>,
}

impl AppState {
    /// Create new application state, wiring `metrics` in as the reconciler's observer
    pub fn new(reconciler: ProfileReconciler, metrics: Arc<CountingObserver>) -> Self {
        let reconciler = reconciler.with_observer(metrics.clone());
        Self {
            reconciler: Arc::new(reconciler),
            metrics,
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let profiles = Router::new()
        .route(
            "/api/profiles/:subject_id",
            get(api::get_profile)
                .post(api::create_profile)
                .patch(api::update_profile),
        )
        .route(
            "/api/profiles/:subject_id/questionnaire",
            get(api::get_questionnaire).put(api::save_questionnaire),
        );

    Router::new()
        .merge(profiles)
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
