use tracing::debug;

use shared_database::Database;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{CreatePatientRequest, Patient, PatientUpdate};

// DOB may be a DATE column and address/conditions TEXT columns, which MySQL
// reports as blobs; casting keeps them decodable as strings on every driver.
const PATIENT_COLUMNS: &str = "patient_id, name, CAST(DOB AS CHAR) AS DOB, gender, email, mobile, \
     CAST(address AS CHAR) AS address, CAST(conditions AS CHAR) AS conditions";

pub struct PatientService {
    db: Database,
}

impl PatientService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn list_patients(&self) -> Result<Vec<Patient>, AppError> {
        debug!("Fetching all patients");

        let sql = format!("SELECT {} FROM patients", PATIENT_COLUMNS);
        sqlx::query_as::<_, Patient>(&sql)
            .fetch_all(self.db.pool())
            .await
            .map_err(AppError::database("Failed to fetch patients"))
    }

    pub async fn create_patient(&self, request: &CreatePatientRequest) -> Result<i64, AppError> {
        debug!("Adding patient with mobile {:?}", request.mobile);

        let insert = sqlx::query(
            "INSERT INTO patients (name, DOB, gender, email, mobile, address, conditions) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.name.clone())
        .bind(request.dob.clone())
        .bind(request.gender.clone())
        .bind(request.email.clone())
        .bind(request.mobile.clone())
        .bind(request.address.clone())
        .bind(request.conditions.clone());

        let patient_id = self
            .db
            .insert_returning_id(insert)
            .await
            .map_err(AppError::database("Database error"))?;

        debug!("Patient added with ID: {}", patient_id);
        Ok(patient_id)
    }

    pub async fn update_patient(&self, patient_id: i64, update: &PatientUpdate) -> Result<(), AppError> {
        debug!("Updating patient: {}", patient_id);

        let result = sqlx::query(
            "UPDATE patients \
             SET name = ?, DOB = ?, mobile = ?, gender = ?, email = ?, address = ? \
             WHERE patient_id = ?",
        )
        .bind(update.name.clone())
        .bind(update.dob.clone())
        .bind(update.mobile.clone())
        .bind(update.gender.clone())
        .bind(update.email.clone())
        .bind(update.address.clone())
        .bind(patient_id)
        .execute(self.db.pool())
        .await
        .map_err(AppError::database("An error occurred while updating the patient"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NoMatch("Patient not found".to_string()));
        }

        Ok(())
    }

    /// Every patient registered under `mobile`; an empty result is a miss.
    pub async fn find_by_mobile(&self, mobile: &str) -> Result<Vec<Patient>, AppError> {
        debug!("Looking up patients by mobile");

        let sql = format!("SELECT {} FROM patients WHERE mobile = ?", PATIENT_COLUMNS);
        let patients = sqlx::query_as::<_, Patient>(&sql)
            .bind(mobile.to_string())
            .fetch_all(self.db.pool())
            .await
            .map_err(AppError::database("Database error"))?;

        if patients.is_empty() {
            return Err(AppError::NoMatch("Patient not found".to_string()));
        }

        Ok(patients)
    }

    pub async fn get_patient(&self, patient_id: i64) -> Result<Option<Patient>, AppError> {
        debug!("Fetching patient: {}", patient_id);

        let sql = format!("SELECT {} FROM patients WHERE patient_id = ?", PATIENT_COLUMNS);
        sqlx::query_as::<_, Patient>(&sql)
            .bind(patient_id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(AppError::database("Database error"))
    }

    pub async fn exists(&self, patient_id: i64) -> Result<bool, AppError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT patient_id FROM patients WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_optional(self.db.pool())
            .await
            .map_err(AppError::database("Database error"))?;

        Ok(row.is_some())
    }

    pub async fn delete_patient(&self, patient_id: i64) -> Result<(), AppError> {
        debug!("Deleting patient: {}", patient_id);

        let result = sqlx::query("DELETE FROM patients WHERE patient_id = ?")
            .bind(patient_id)
            .execute(self.db.pool())
            .await
            .map_err(AppError::database("An error occurred while deleting the patient."))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NoMatch("Patient not found.".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::test_utils::TestContext;

    fn new_patient(name: &str, mobile: &str) -> CreatePatientRequest {
        CreatePatientRequest {
            name: Some(name.to_string()),
            dob: Some("1979-11-30".to_string()),
            gender: Some("male".to_string()),
            email: None,
            mobile: Some(mobile.to_string()),
            address: None,
            conditions: Some("hypertension".to_string()),
        }
    }

    #[tokio::test]
    async fn create_then_fetch_round_trips_optional_fields() {
        let ctx = TestContext::new().await;
        let service = PatientService::new(&ctx.state);

        let id = service.create_patient(&new_patient("Arjun", "5551112222")).await.unwrap();
        assert!(id > 0);

        let patient = service.get_patient(id).await.unwrap().unwrap();
        assert_eq!(patient.name, "Arjun");
        assert_eq!(patient.dob, "1979-11-30");
        assert_eq!(patient.email, None);
        assert_eq!(patient.conditions.as_deref(), Some("hypertension"));
    }

    #[tokio::test]
    async fn create_assigns_the_id_of_the_stored_row() {
        let ctx = TestContext::new().await;
        let service = PatientService::new(&ctx.state);

        let first = service.create_patient(&new_patient("Meera", "5551230001")).await.unwrap();
        let second = service.create_patient(&new_patient("Rohan", "5551230002")).await.unwrap();
        assert_ne!(first, second);

        let found = service.find_by_mobile("5551230002").await.unwrap();
        assert_eq!(found[0].patient_id, second);
        assert_eq!(ctx.count_rows("patients").await, 2);
    }

    #[tokio::test]
    async fn text_columns_decode_when_set_and_when_null() {
        let ctx = TestContext::new().await;
        let service = PatientService::new(&ctx.state);

        let mut request = new_patient("Isha", "5554561234");
        request.address = Some("7 Hill Street, Pune".to_string());
        let with_address = service.create_patient(&request).await.unwrap();

        let mut request = new_patient("Dev", "5554561235");
        request.conditions = None;
        let bare = service.create_patient(&request).await.unwrap();

        let patients = service.list_patients().await.unwrap();
        let isha = patients.iter().find(|p| p.patient_id == with_address).unwrap();
        assert_eq!(isha.address.as_deref(), Some("7 Hill Street, Pune"));
        assert_eq!(isha.conditions.as_deref(), Some("hypertension"));

        let dev = patients.iter().find(|p| p.patient_id == bare).unwrap();
        assert_eq!(dev.address, None);
        assert_eq!(dev.conditions, None);
    }

    #[tokio::test]
    async fn mobile_lookup_returns_every_match() {
        let ctx = TestContext::new().await;
        let service = PatientService::new(&ctx.state);

        ctx.seed_patient("Kavya", "5553334444").await;
        ctx.seed_patient("Kiran", "5553334444").await;
        ctx.seed_patient("Nisha", "5559990000").await;

        let matches = service.find_by_mobile("5553334444").await.unwrap();
        assert_eq!(matches.len(), 2);

        assert_matches!(service.find_by_mobile("0000000000").await, Err(AppError::NoMatch(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_unknown_ids() {
        let ctx = TestContext::new().await;
        let service = PatientService::new(&ctx.state);

        let update = PatientUpdate {
            name: "Ghost".into(),
            dob: "2000-01-01".into(),
            mobile: "5550000000".into(),
            gender: "other".into(),
            email: "ghost@example.com".into(),
            address: "Nowhere".into(),
        };

        assert_matches!(service.update_patient(999_999, &update).await, Err(AppError::NoMatch(_)));
        assert_matches!(service.delete_patient(999_999).await, Err(AppError::NoMatch(_)));
        assert!(!service.exists(999_999).await.unwrap());
    }
}
