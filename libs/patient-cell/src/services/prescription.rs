use sqlx::{Any, QueryBuilder};
use tracing::debug;

use shared_database::Database;
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::PrescriptionImage;
use crate::services::uploads::StoredFile;

pub struct PrescriptionService {
    db: Database,
}

impl PrescriptionService {
    pub fn new(state: &AppState) -> Self {
        Self {
            db: state.db.clone(),
        }
    }

    pub async fn list_images(&self, patient_id: i64) -> Result<Vec<PrescriptionImage>, AppError> {
        debug!("Fetching prescription images for patient: {}", patient_id);

        sqlx::query_as::<_, PrescriptionImage>(
            "SELECT image_id, patient_id, image_path FROM prescription_images WHERE patient_id = ?",
        )
        .bind(patient_id)
        .fetch_all(self.db.pool())
        .await
        .map_err(AppError::database("Failed to fetch images"))
    }

    /// Inserts one row per stored file in a single statement, so either all
    /// rows land or none do.
    pub async fn add_images(&self, patient_id: i64, files: &[StoredFile]) -> Result<u64, AppError> {
        if files.is_empty() {
            return Ok(0);
        }

        debug!("Adding {} prescription images for patient: {}", files.len(), patient_id);

        let mut builder: QueryBuilder<Any> =
            QueryBuilder::new("INSERT INTO prescription_images (patient_id, image_path) ");
        builder.push_values(files, |mut row, file| {
            row.push_bind(patient_id).push_bind(file.stored_path.clone());
        });

        let result = builder
            .build()
            .execute(self.db.pool())
            .await
            .map_err(AppError::database("Database error"))?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use shared_utils::test_utils::TestContext;

    fn stored(name: &str) -> StoredFile {
        StoredFile {
            original_name: name.to_string(),
            stored_path: format!("uploads/1700000000000-{}", name),
            disk_path: PathBuf::from(format!("/tmp/{}", name)),
        }
    }

    #[tokio::test]
    async fn batch_insert_writes_one_row_per_file() {
        let ctx = TestContext::new().await;
        let service = PrescriptionService::new(&ctx.state);
        let patient_id = ctx.seed_patient("Divya", "5552223333").await;

        let inserted = service
            .add_images(patient_id, &[stored("scan-1.png"), stored("scan-2.png")])
            .await
            .unwrap();
        assert_eq!(inserted, 2);

        let images = service.list_images(patient_id).await.unwrap();
        let paths: Vec<&str> = images.iter().map(|i| i.image_path.as_str()).collect();
        assert_eq!(paths, vec!["uploads/1700000000000-scan-1.png", "uploads/1700000000000-scan-2.png"]);
    }

    #[tokio::test]
    async fn images_for_unknown_patient_are_empty() {
        let ctx = TestContext::new().await;
        let service = PrescriptionService::new(&ctx.state);

        assert!(service.list_images(77).await.unwrap().is_empty());
        assert_eq!(service.add_images(77, &[]).await.unwrap(), 0);
    }
}
