use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Form, Json,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use shared_models::error::AppError;

use crate::validation::{validate, Validate};

/// JSON body that has passed its [`Validate`] rules before the handler runs.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let value = json_body(req, state).await?;
        validate(&value)?;
        Ok(Self(value))
    }
}

/// Body accepted as JSON, url-encoded form or multipart form fields, then
/// validated like [`ValidatedJson`]. Multipart requests must not carry files.
#[derive(Debug, Clone)]
pub struct ValidatedForm<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedForm<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let value: T = if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            let fields = multipart_text_fields(multipart).await?;
            serde_json::from_value(Value::Object(fields))
                .map_err(|e| AppError::BadRequest(e.to_string()))?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(value) = Form::<T>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            value
        } else {
            json_body(req, state).await?
        };

        validate(&value)?;
        Ok(Self(value))
    }
}

async fn json_body<S, T>(req: Request, state: &S) -> Result<T, AppError>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    let Json(value) = Json::<T>::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?;
    Ok(value)
}

async fn multipart_text_fields(mut multipart: Multipart) -> Result<Map<String, Value>, AppError> {
    let mut fields = Map::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(AppError::from)?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            return Err(AppError::BadRequest(format!("Unexpected file field: {}", name)));
        }
        let text = field.text().await.map_err(AppError::from)?;
        fields.insert(name, Value::String(text));
    }

    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::body::Body;
    use serde::Deserialize;

    use crate::validation::present;

    #[derive(Debug, Deserialize)]
    struct Note {
        title: Option<String>,
    }

    impl Validate for Note {
        fn required(&self) -> Vec<(&'static str, bool)> {
            vec![("title", present(&self.title))]
        }
    }

    fn request(content_type: &str, body: impl Into<Body>) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, content_type)
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn json_body_is_validated() {
        let req = request("application/json", r#"{"title":"Follow-up"}"#);
        let ValidatedJson(note) = ValidatedJson::<Note>::from_request(req, &()).await.unwrap();
        assert_eq!(note.title.as_deref(), Some("Follow-up"));

        let req = request("application/json", r#"{}"#);
        let result = ValidatedJson::<Note>::from_request(req, &()).await;
        assert_matches!(result, Err(AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let req = request("application/json", "{not json");
        let result = ValidatedJson::<Note>::from_request(req, &()).await;
        assert_matches!(result, Err(AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn form_accepts_multipart_text_fields() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"title\"\r\n\r\n\
            Checkup\r\n\
            --XBOUNDARY--\r\n";
        let req = request("multipart/form-data; boundary=XBOUNDARY", body);

        let ValidatedForm(note) = ValidatedForm::<Note>::from_request(req, &()).await.unwrap();
        assert_eq!(note.title.as_deref(), Some("Checkup"));
    }

    #[tokio::test]
    async fn form_rejects_files_in_multipart() {
        let body = "--XBOUNDARY\r\n\
            Content-Disposition: form-data; name=\"title\"; filename=\"a.txt\"\r\n\
            Content-Type: text/plain\r\n\r\n\
            hello\r\n\
            --XBOUNDARY--\r\n";
        let req = request("multipart/form-data; boundary=XBOUNDARY", body);

        let result = ValidatedForm::<Note>::from_request(req, &()).await;
        assert_matches!(result, Err(AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn form_accepts_urlencoded_and_json() {
        let req = request("application/x-www-form-urlencoded", "title=Review");
        let ValidatedForm(note) = ValidatedForm::<Note>::from_request(req, &()).await.unwrap();
        assert_eq!(note.title.as_deref(), Some("Review"));

        let req = request("application/json", r#"{"title":"Review"}"#);
        let ValidatedForm(note) = ValidatedForm::<Note>::from_request(req, &()).await.unwrap();
        assert_eq!(note.title.as_deref(), Some("Review"));
    }
}
