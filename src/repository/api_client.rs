use std::path::Path;
use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{AppError, AppResult, GENERIC_ERROR_MESSAGE};
use crate::schemas::{remove_nulls, serialize_to_map};
use crate::session::Session;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// File uploaded alongside a form payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub field_name: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn image(file_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            field_name: "images".to_string(),
            file_name: file_name.to_string(),
            content_type: mime_guess::from_path(file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            bytes,
        }
    }

    pub async fn image_from_path(path: &Path) -> AppResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(Self::image(&file_name, bytes))
    }
}

/// Binary response, e.g. a receipt PDF.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Thin wrapper over the backend REST API. Every call carries the session's
/// bearer token; a 401 clears the session and schedules the login redirect.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    config: Arc<ClientConfig>,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(config: Arc<ClientConfig>, session: Arc<Session>) -> AppResult<Self> {
        let base = url::Url::parse(&config.api_base_url).map_err(|error| {
            AppError::BadRequest(format!("Invalid API_BASE_URL '{}': {error}", config.api_base_url))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(AppError::BadRequest(format!(
                "API_BASE_URL must use http or https, got '{}'.",
                base.scheme()
            )));
        }
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|error| AppError::Internal(format!("Could not build HTTP client: {error}")))?;
        Ok(Self {
            http,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        read_json(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(builder, path).await?;
        read_json(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> AppResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        let response = self.send(builder, path).await?;
        read_json(response).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self.send(self.request(Method::DELETE, path), path).await?;
        read_json(response).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(&self, path: &str, form: Form) -> AppResult<T> {
        let builder = self.request(Method::POST, path).multipart(form);
        let response = self.send(builder, path).await?;
        read_json(response).await
    }

    pub async fn download(&self, path: &str) -> AppResult<Download> {
        let response = self.send(self.request(Method::GET, path), path).await?;
        let headers = response.headers().clone();
        let bytes = response.bytes().await?.to_vec();
        Ok(Download {
            bytes,
            file_name: header_str(&headers, CONTENT_DISPOSITION.as_str())
                .and_then(|value| file_name_from_disposition(&value)),
            content_type: header_str(&headers, CONTENT_TYPE.as_str()),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .http
            .request(method, self.config.endpoint(path))
            .header(REQUEST_ID_HEADER, uuid::Uuid::new_v4().to_string());
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: RequestBuilder, path: &str) -> AppResult<Response> {
        let response = builder.send().await.map_err(|error| {
            tracing::error!(error = %error, path, "Backend request failed");
            AppError::Dependency(GENERIC_ERROR_MESSAGE.to_string())
        })?;

        let status = response.status();
        if self.config.http_debug_runtime() {
            tracing::debug!(path, status = status.as_u16(), "Backend response");
        }
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!(path, "Backend rejected credentials");
            self.session.handle_unauthorized();
            return Err(AppError::Unauthorized(
                "Your session has expired. Please sign in again.".to_string(),
            ));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| first_error_message(&value))
            .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
        tracing::warn!(path, status = status.as_u16(), message = %message, "Backend returned an error");
        Err(AppError::from_status(status.as_u16(), message))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> AppResult<T> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_str(&body)?)
}

/// First human-readable message in a backend error body. Handles
/// `{message: "..."}`, `{message: ["...", ...]}`, `{errors: [{message}]}`
/// and `{error: "..."}`.
pub fn first_error_message(body: &Value) -> Option<String> {
    let from_message = match body.get("message") {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Array(items)) => items.iter().find_map(|item| match item {
            Value::String(text) => Some(text.clone()),
            other => other.get("message").and_then(Value::as_str).map(ToOwned::to_owned),
        }),
        _ => None,
    };
    let from_errors = || {
        body.get("errors")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .and_then(|item| {
                item.as_str()
                    .or_else(|| item.get("message").and_then(Value::as_str))
            })
            .map(ToOwned::to_owned)
    };
    let from_error = || body.get("error").and_then(Value::as_str).map(ToOwned::to_owned);

    from_message
        .or_else(from_errors)
        .or_else(from_error)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Multipart body: one text part per payload field (lists as JSON text),
/// one file part per attachment. Absent optionals produce no part.
pub fn build_multipart<T: Serialize>(payload: &T, attachments: &[Attachment]) -> AppResult<Form> {
    let mut form = Form::new();
    for (key, value) in remove_nulls(serialize_to_map(payload)) {
        let text = match value {
            Value::String(text) => text,
            other @ (Value::Array(_) | Value::Object(_)) => serde_json::to_string(&other)?,
            other => other.to_string(),
        };
        form = form.text(key, text);
    }
    for attachment in attachments {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.content_type)
            .map_err(|error| AppError::BadRequest(format!("Invalid attachment type: {error}")))?;
        form = form.part(attachment.field_name.clone(), part);
    }
    Ok(form)
}

fn header_str(headers: &HeaderMap<HeaderValue>, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

fn file_name_from_disposition(value: &str) -> Option<String> {
    value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').trim().to_string())
        .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains('\\'))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::Multipart;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::{
        build_multipart, file_name_from_disposition, first_error_message, ApiClient, Attachment,
    };
    use crate::config::ClientConfig;
    use crate::error::{AppError, GENERIC_ERROR_MESSAGE};
    use crate::repository::test_support::{client_for, spawn_backend};
    use crate::routes::{Redirect, Route};
    use crate::session::tests::token_for;
    use crate::session::Session;

    async fn echo_auth(headers: HeaderMap) -> Json<Value> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_string();
        let request_id = headers.get("x-request-id").is_some();
        Json(json!({"authorization": auth, "hasRequestId": request_id}))
    }

    async fn unauthorized() -> impl IntoResponse {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"message": "Unauthorized", "statusCode": 401})),
        )
    }

    async fn rejects_surface() -> impl IntoResponse {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": ["surface must be a positive number", "city should not be empty"],
                "error": "Bad Request",
                "statusCode": 400
            })),
        )
    }

    async fn list_parts(mut multipart: Multipart) -> Json<Value> {
        let mut parts = Vec::new();
        while let Some(field) = multipart.next_field().await.expect("multipart field") {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(ToOwned::to_owned);
            let text = field.text().await.unwrap_or_default();
            parts.push(json!({"name": name, "fileName": file_name, "text": text}));
        }
        Json(json!({"id": "prop-1", "parts": parts}))
    }

    async fn receipt() -> impl IntoResponse {
        (
            [
                (header::CONTENT_TYPE, "application/pdf"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"receipt-2026-10.pdf\"",
                ),
            ],
            b"%PDF-1.4 fake".to_vec(),
        )
    }

    fn backend() -> Router {
        Router::new()
            .route("/me", get(echo_auth))
            .route(
                "/expired",
                get(unauthorized)
                    .post(unauthorized)
                    .put(unauthorized)
                    .delete(unauthorized),
            )
            .route("/properties", post(rejects_surface))
            .route("/upload", post(list_parts))
            .route("/payments/pay-1/receipt", get(receipt))
    }

    #[tokio::test]
    async fn injects_bearer_token_and_request_id() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let token = token_for("own-1", "OWNER", 3600);
        client.session().set_token(&token).expect("stored");

        let body: Value = client.get("/me").await.expect("ok");
        assert_eq!(body["authorization"], json!(format!("Bearer {token}")));
        assert_eq!(body["hasRequestId"], json!(true));
    }

    #[tokio::test]
    async fn omits_authorization_without_session() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let body: Value = client.get("/me").await.expect("ok");
        assert_eq!(body["authorization"], json!(""));
    }

    #[tokio::test]
    async fn unauthorized_response_clears_session_and_redirects() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        client
            .session()
            .set_token(&token_for("own-1", "OWNER", 3600))
            .expect("stored");

        let error = client
            .post::<_, Value>("/expired", &json!({"amount": 10}))
            .await
            .expect_err("401");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());
        assert_eq!(
            client.session().take_redirect(),
            Some(Redirect::now(Route::Login))
        );

        client
            .session()
            .set_token(&token_for("own-1", "OWNER", 3600))
            .expect("stored");
        let error = client.get::<Value>("/expired").await.expect_err("401");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());

        client
            .session()
            .set_token(&token_for("own-1", "OWNER", 3600))
            .expect("stored");
        let error = client.delete::<Value>("/expired").await.expect_err("401");
        assert!(error.is_unauthorized());
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn unauthorized_upload_update_and_download_clear_session() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let sign_in = || {
            client
                .session()
                .set_token(&token_for("own-1", "OWNER", 3600))
                .expect("stored");
        };

        sign_in();
        let error = client
            .put::<_, Value>("/expired", &json!({"name": "Loft"}))
            .await
            .expect_err("401");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());
        assert_eq!(
            client.session().take_redirect(),
            Some(Redirect::now(Route::Login))
        );

        sign_in();
        let form = build_multipart(&json!({"name": "Loft"}), &[]).expect("form");
        let error = client
            .post_multipart::<Value>("/expired", form)
            .await
            .expect_err("401");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());
        assert_eq!(
            client.session().take_redirect(),
            Some(Redirect::now(Route::Login))
        );

        sign_in();
        let error = client.download("/expired").await.expect_err("401");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());
        assert_eq!(
            client.session().take_redirect(),
            Some(Redirect::now(Route::Login))
        );
    }

    #[tokio::test]
    async fn surfaces_first_validation_message() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let error = client
            .post::<_, Value>("/properties", &json!({}))
            .await
            .expect_err("400");
        assert!(matches!(error, AppError::BadRequest(_)));
        assert_eq!(error.user_message(), "surface must be a positive number");
    }

    #[tokio::test]
    async fn network_failures_use_generic_message() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let client = client_for(&format!("http://{addr}"));
        let error = client.get::<Value>("/me").await.expect_err("refused");
        assert!(matches!(error, AppError::Dependency(_)));
        assert_eq!(error.user_message(), GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn sends_multipart_with_images() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let payload = json!({
            "name": "Loft",
            "surface": "45.50",
            "amenities": ["balcony", "lift"],
            "acquisitionPrice": null
        });
        let form = build_multipart(
            &payload,
            &[Attachment::image("front.jpg", vec![0xff, 0xd8, 0xff])],
        )
        .expect("form");
        let body: Value = client.post_multipart("/upload", form).await.expect("ok");

        let parts = body["parts"].as_array().expect("parts");
        let names: Vec<&str> = parts
            .iter()
            .filter_map(|part| part["name"].as_str())
            .collect();
        assert_eq!(names, vec!["amenities", "name", "surface", "images"]);
        assert_eq!(parts[0]["text"], json!("[\"balcony\",\"lift\"]"));
        assert_eq!(parts[3]["fileName"], json!("front.jpg"));
    }

    #[tokio::test]
    async fn downloads_binary_with_file_name() {
        let base = spawn_backend(backend()).await;
        let client = client_for(&base);
        let download = client
            .download("/payments/pay-1/receipt")
            .await
            .expect("ok");
        assert_eq!(download.bytes, b"%PDF-1.4 fake".to_vec());
        assert_eq!(download.file_name.as_deref(), Some("receipt-2026-10.pdf"));
        assert_eq!(download.content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn guesses_attachment_content_types() {
        assert_eq!(
            Attachment::image("front.jpg", vec![0xff]).content_type,
            "image/jpeg"
        );
        assert_eq!(
            Attachment::image("plan.png", vec![0x89]).content_type,
            "image/png"
        );
        assert_eq!(
            Attachment::image("scan.qqzz", vec![0]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn extracts_messages_from_error_shapes() {
        assert_eq!(
            first_error_message(&json!({"message": "Email already used"})).as_deref(),
            Some("Email already used")
        );
        assert_eq!(
            first_error_message(&json!({"errors": [{"field": "x", "message": "x is bad"}]}))
                .as_deref(),
            Some("x is bad")
        );
        assert_eq!(
            first_error_message(&json!({"error": "Conflict"})).as_deref(),
            Some("Conflict")
        );
        assert_eq!(first_error_message(&json!({"message": "  "})), None);
    }

    #[test]
    fn rejects_path_like_download_names() {
        assert_eq!(
            file_name_from_disposition("inline; filename=lease.pdf").as_deref(),
            Some("lease.pdf")
        );
        assert_eq!(
            file_name_from_disposition("attachment; filename=\"../etc/passwd\""),
            None
        );
    }

    #[test]
    fn shares_session_between_clones() {
        let client = client_for("http://127.0.0.1:9");
        let clone = client.clone();
        assert!(Arc::ptr_eq(client.session(), clone.session()));
    }

    #[test]
    fn rejects_unusable_base_urls() {
        for base in ["not a url", "ftp://files.example.com"] {
            let result = ApiClient::new(
                Arc::new(ClientConfig::for_base_url(base)),
                Arc::new(Session::in_memory()),
            );
            assert!(matches!(result, Err(AppError::BadRequest(_))), "{base}");
        }
    }
}
