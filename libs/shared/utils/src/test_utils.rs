use std::sync::Arc;
use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use tempfile::TempDir;

use shared_config::AppConfig;
use shared_database::Database;

use crate::state::AppState;

/// SQLite rendition of the clinic tables, used by tests and local runs.
pub const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS patients (
        patient_id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        DOB TEXT NOT NULL,
        gender TEXT NOT NULL,
        email TEXT,
        mobile TEXT NOT NULL,
        address TEXT,
        conditions TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS treatments (
        treatment_id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id INTEGER NOT NULL,
        date TEXT NOT NULL,
        process TEXT NOT NULL,
        amount REAL NOT NULL,
        treated_by TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS prescription_images (
        image_id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id INTEGER NOT NULL,
        image_path TEXT NOT NULL
    )
    "#,
];

/// In-memory SQLite database with the clinic tables created.
///
/// The pool holds a single connection that never expires, since each
/// `sqlite::memory:` connection is its own database.
pub async fn test_database() -> Database {
    install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .acquire_timeout(Duration::from_secs(5))
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");

    for statement in SQLITE_SCHEMA {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("create test schema");
    }

    Database::from_pool(pool)
}

pub struct TestConfig {
    pub port: u16,
    pub database_url: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self, upload_dir: &TempDir) -> AppConfig {
        AppConfig {
            port: self.port,
            database_url: self.database_url.clone(),
            database_max_connections: 1,
            database_acquire_timeout: Duration::from_secs(5),
            upload_dir: upload_dir.path().to_path_buf(),
            upload_body_limit: 5 * 1024 * 1024,
        }
    }
}

/// Application state backed by a fresh database and a scratch upload
/// directory. Keep the context alive for as long as the state is used.
pub struct TestContext {
    pub state: Arc<AppState>,
    pub upload_dir: TempDir,
}

impl TestContext {
    pub async fn new() -> Self {
        let upload_dir = TempDir::new().expect("temp upload dir");
        let config = TestConfig::default().to_app_config(&upload_dir);
        let db = test_database().await;

        Self {
            state: Arc::new(AppState::new(config, db)),
            upload_dir,
        }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub async fn seed_patient(&self, name: &str, mobile: &str) -> i64 {
        let insert = sqlx::query(
            "INSERT INTO patients (name, DOB, gender, email, mobile, address, conditions) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(name.to_string())
        .bind("1990-04-12".to_string())
        .bind("female".to_string())
        .bind(Some(format!("{}@example.com", name.to_lowercase())))
        .bind(mobile.to_string())
        .bind(Some("12 Lake Road".to_string()))
        .bind(None::<String>);

        self.db().insert_returning_id(insert).await.expect("seed patient")
    }

    pub async fn seed_treatment(&self, patient_id: i64, date: &str, process: &str) -> i64 {
        let insert = sqlx::query(
            "INSERT INTO treatments (patient_id, date, process, amount, treated_by) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(patient_id)
        .bind(date.to_string())
        .bind(process.to_string())
        .bind(750.0_f64)
        .bind("Dr. Mehta".to_string());

        self.db().insert_returning_id(insert).await.expect("seed treatment")
    }

    pub async fn count_rows(&self, table: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(self.db().pool())
            .await
            .expect("count rows");
        count
    }
}
