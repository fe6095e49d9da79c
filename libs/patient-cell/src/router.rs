use std::sync::Arc;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use shared_utils::AppState;

use crate::handlers::*;

/// Patient routes, meant to be nested under `/api/patients`.
pub fn patient_routes(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.upload_body_limit;

    Router::new()
        .route("/", get(list_patients))
        .route("/findPatient/{mobile}", get(find_patient))
        .route("/getPatientTreatment/{patient_id}", get(get_patient_treatment))
        .route("/getImages/{patient_id}", get(get_images))
        .route("/addPatient", post(add_patient))
        .route("/addTreatment", post(add_treatment))
        .route(
            "/addImages/{patient_id}",
            post(add_images).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/editPatient/{id}", put(edit_patient))
        .route("/deletePatient/{id}", delete(delete_patient))
        .with_state(state)
}
