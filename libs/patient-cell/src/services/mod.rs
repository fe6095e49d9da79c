pub mod patient;
pub mod prescription;
pub mod treatment;
pub mod uploads;

pub use patient::PatientService;
pub use prescription::PrescriptionService;
pub use treatment::TreatmentService;
pub use uploads::UploadService;
