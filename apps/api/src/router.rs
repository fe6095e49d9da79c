use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};
use tower_http::services::ServeDir;

use patient_cell::router::patient_routes;
use patient_cell::services::uploads::UPLOADS_ROUTE;
use shared_utils::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/", get(|| async { "Clinic Records API is running!" }))
        .nest("/api/patients", patient_routes(state.clone()))
        .nest_service(UPLOADS_ROUTE, uploads)
}
