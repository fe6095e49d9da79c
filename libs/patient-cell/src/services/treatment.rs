use tracing::debug;

use shared_database::Database;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{NewTreatment, PatientWithTreatments, Treatment};
use crate::services::PatientService;

pub struct TreatmentService {
    db: Database,
    patients: PatientService,
}

impl TreatmentService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
            patients: PatientService::new(state),
        }
    }

    /// Records a treatment. The patient reference is stored as given; it is
    /// not checked against the patients table.
    pub async fn create_treatment(&self, treatment: &NewTreatment) -> Result<i64, AppError> {
        debug!("Adding treatment for patient: {}", treatment.patient_id);

        let insert = sqlx::query(
            "INSERT INTO treatments (patient_id, date, process, amount, treated_by) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(treatment.patient_id)
        .bind(treatment.date.clone())
        .bind(treatment.process.clone())
        .bind(treatment.amount)
        .bind(treatment.treated_by.clone());

        self.db
            .insert_returning_id(insert)
            .await
            .map_err(AppError::database("Database error"))
    }

    /// Treatments for a patient, most recent first.
    pub async fn list_for_patient(&self, patient_id: i64) -> Result<Vec<Treatment>, AppError> {
        sqlx::query_as::<_, Treatment>(
            "SELECT treatment_id, patient_id, CAST(date AS CHAR) AS date, process, amount, treated_by \
             FROM treatments \
             WHERE patient_id = ? \
             ORDER BY date DESC, treatment_id DESC",
        )
        .bind(patient_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(AppError::database("Database error"))
    }

    pub async fn patient_with_treatments(&self, patient_id: i64) -> Result<PatientWithTreatments, AppError> {
        debug!("Fetching patient {} with treatments", patient_id);

        let patient = self
            .patients
            .get_patient(patient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

        let treatments = self.list_for_patient(patient_id).await?;

        Ok(PatientWithTreatments { patient, treatments })
    }
}
