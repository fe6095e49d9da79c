use std::sync::Arc;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_models::error::AppError;
use shared_utils::extractor::{ValidatedForm, ValidatedJson};
use shared_utils::validation::{parse_id, validate_mobile};
use shared_utils::AppState;

use crate::models::{
    CreatePatientRequest, CreateTreatmentRequest, Patient, PatientUpdate, PatientWithTreatments,
    PrescriptionImage, UpdatePatientRequest,
};
use crate::services::uploads::{MAX_PRESCRIPTION_FILES, PRESCRIPTION_FIELD};
use crate::services::{PatientService, PrescriptionService, TreatmentService, UploadService};

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Patient>>, AppError> {
    let service = PatientService::new(&state);

    let patients = service.list_patients().await?;

    Ok(Json(patients))
}

#[axum::debug_handler]
pub async fn add_patient(
    State(state): State<Arc<AppState>>,
    ValidatedForm(request): ValidatedForm<CreatePatientRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let service = PatientService::new(&state);

    let patient_id = service.create_patient(&request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Patient added successfully",
            "patientId": patient_id
        })),
    ))
}

#[axum::debug_handler]
pub async fn edit_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_id(&id)?;
    let service = PatientService::new(&state);

    let update = PatientUpdate::from(request);
    service.update_patient(patient_id, &update).await?;

    Ok(Json(json!({
        "message": "Patient updated successfully",
        "updatedFields": update
    })))
}

#[axum::debug_handler]
pub async fn find_patient(
    State(state): State<Arc<AppState>>,
    Path(mobile): Path<String>,
) -> Result<Json<Vec<Patient>>, AppError> {
    validate_mobile(&mobile)?;
    let service = PatientService::new(&state);

    let patients = service.find_by_mobile(&mobile).await?;

    Ok(Json(patients))
}

#[axum::debug_handler]
pub async fn delete_patient(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let patient_id = parse_id(&id)?;
    let service = PatientService::new(&state);

    service.delete_patient(patient_id).await?;

    Ok(Json(json!({ "message": "Patient deleted successfully." })))
}

#[axum::debug_handler]
pub async fn add_treatment(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateTreatmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let treatment = request.to_new_treatment()?;
    let service = TreatmentService::new(&state);

    let treatment_id = service.create_treatment(&treatment).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Treatment added successfully",
            "treatmentId": treatment_id
        })),
    ))
}

#[axum::debug_handler]
pub async fn get_patient_treatment(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientWithTreatments>, AppError> {
    let patient_id = parse_id(&patient_id)?;
    let service = TreatmentService::new(&state);

    let history = service.patient_with_treatments(patient_id).await?;

    Ok(Json(history))
}

#[axum::debug_handler]
pub async fn get_images(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PrescriptionImage>>, AppError> {
    let patient_id = parse_id(&patient_id)?;
    let service = PrescriptionService::new(&state);

    let images = service.list_images(patient_id).await?;

    Ok(Json(images))
}

/// Files are held in memory until the patient is known to exist, so a
/// rejected upload never touches the disk.
#[axum::debug_handler]
pub async fn add_images(
    State(state): State<Arc<AppState>>,
    Path(patient_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let patient_id = parse_id(&patient_id)?;
    let uploads = UploadService::new(&state);

    let files = match multipart {
        Ok(multipart) => {
            uploads
                .receive(multipart, PRESCRIPTION_FIELD, MAX_PRESCRIPTION_FILES)
                .await?
        }
        Err(rejection) => {
            debug!("Image upload without multipart body: {}", rejection.body_text());
            Vec::new()
        }
    };

    if files.is_empty() {
        return Err(AppError::ValidationError("No files uploaded".to_string()));
    }

    if !PatientService::new(&state).exists(patient_id).await? {
        return Err(AppError::NotFound("Patient not found".to_string()));
    }

    let stored = uploads.store(files).await?;

    if let Err(e) = PrescriptionService::new(&state).add_images(patient_id, &stored).await {
        uploads.discard(&stored).await;
        return Err(e);
    }

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Images added successfully!" })),
    ))
}
