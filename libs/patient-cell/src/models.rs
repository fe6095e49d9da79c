use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use shared_models::error::AppError;
use shared_utils::validation::{parse_id, present, validate_mobile, Validate, INVALID_MOBILE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Patient {
    pub patient_id: i64,
    pub name: String,
    #[serde(rename = "DOB")]
    #[sqlx(rename = "DOB")]
    pub dob: String,
    pub gender: String,
    pub email: Option<String>,
    pub mobile: String,
    pub address: Option<String>,
    pub conditions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Treatment {
    pub treatment_id: i64,
    pub patient_id: i64,
    pub date: String,
    pub process: String,
    pub amount: f64,
    pub treated_by: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PrescriptionImage {
    pub image_id: i64,
    pub patient_id: i64,
    pub image_path: String,
}

/// A patient row with its treatment history folded in at the top level.
#[derive(Debug, Clone, Serialize)]
pub struct PatientWithTreatments {
    #[serde(flatten)]
    pub patient: Patient,
    pub treatments: Vec<Treatment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreatePatientRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "DOB", default, deserialize_with = "lenient_string")]
    pub dob: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub mobile: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    // Older clients post the singular form.
    #[serde(alias = "condition", default, deserialize_with = "lenient_string")]
    pub conditions: Option<String>,
}

impl Validate for CreatePatientRequest {
    fn required(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("name", present(&self.name)),
            ("DOB", present(&self.dob)),
            ("gender", present(&self.gender)),
            ("mobile", present(&self.mobile)),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePatientRequest {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(rename = "DOB", default, deserialize_with = "lenient_string")]
    pub dob: Option<String>,
    /// Kept raw: an edit only accepts the mobile number as a JSON string.
    #[serde(default)]
    pub mobile: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
}

impl UpdatePatientRequest {
    fn mobile_text(&self) -> Option<&str> {
        self.mobile.as_ref().and_then(Value::as_str)
    }
}

impl Validate for UpdatePatientRequest {
    fn required(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("name", present(&self.name)),
            ("DOB", present(&self.dob)),
            ("mobile", self.mobile.as_ref().is_some_and(|m| !m.is_null() && m.as_str() != Some(""))),
            ("gender", present(&self.gender)),
            ("email", present(&self.email)),
            ("address", present(&self.address)),
        ]
    }

    fn check(&self) -> Result<(), AppError> {
        match self.mobile_text() {
            Some(mobile) => validate_mobile(mobile),
            None => Err(AppError::ValidationError(INVALID_MOBILE.to_string())),
        }
    }
}

/// The full set of columns an edit replaces, echoed back as `updatedFields`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientUpdate {
    pub name: String,
    #[serde(rename = "DOB")]
    pub dob: String,
    pub mobile: String,
    pub gender: String,
    pub email: String,
    pub address: String,
}

impl From<UpdatePatientRequest> for PatientUpdate {
    fn from(request: UpdatePatientRequest) -> Self {
        let mobile = request.mobile_text().unwrap_or_default().to_string();
        Self {
            name: request.name.unwrap_or_default(),
            dob: request.dob.unwrap_or_default(),
            mobile,
            gender: request.gender.unwrap_or_default(),
            email: request.email.unwrap_or_default(),
            address: request.address.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTreatmentRequest {
    #[serde(rename = "patientId", default, deserialize_with = "lenient_string")]
    pub patient_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub process: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: Option<String>,
    #[serde(rename = "treatedBy", default, deserialize_with = "lenient_string")]
    pub treated_by: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTreatment {
    pub patient_id: i64,
    pub date: String,
    pub process: String,
    pub amount: f64,
    pub treated_by: String,
}

impl CreateTreatmentRequest {
    pub fn to_new_treatment(&self) -> Result<NewTreatment, AppError> {
        let patient_id = parse_id(self.patient_id.as_deref().unwrap_or_default())?;
        let amount = self
            .amount
            .as_deref()
            .unwrap_or_default()
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| AppError::ValidationError("Invalid amount".to_string()))?;

        Ok(NewTreatment {
            patient_id,
            date: self.date.clone().unwrap_or_default(),
            process: self.process.clone().unwrap_or_default(),
            amount,
            treated_by: self.treated_by.clone().unwrap_or_default(),
        })
    }
}

impl Validate for CreateTreatmentRequest {
    fn required(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("patientId", present(&self.patient_id)),
            ("date", present(&self.date)),
            ("process", present(&self.process)),
            ("amount", present(&self.amount)),
            ("treatedBy", present(&self.treated_by)),
        ]
    }

    fn check(&self) -> Result<(), AppError> {
        self.to_new_treatment().map(|_| ())
    }
}

/// Accepts a string, number or boolean and keeps its textual form. Form
/// posts send everything as strings while JSON clients often send numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(b.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}
