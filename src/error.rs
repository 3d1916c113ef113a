use std::fmt;

use thiserror::Error;

/// Shown whenever the backend gives us nothing better to say.
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    Dependency(String),
    #[error("{0}")]
    Internal(String),
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),
}

impl AppError {
    /// Text surfaced to the user. Backend validation messages pass through
    /// verbatim, transport failures collapse to the generic message.
    pub fn user_message(&self) -> String {
        match self {
            Self::BadRequest(message)
            | Self::Unauthorized(message)
            | Self::Forbidden(message)
            | Self::NotFound(message)
            | Self::Conflict(message)
            | Self::UnprocessableEntity(message) => message.clone(),
            Self::Validation(errors) => errors
                .first_message()
                .unwrap_or(GENERIC_ERROR_MESSAGE)
                .to_string(),
            Self::Dependency(_) | Self::Internal(_) => GENERIC_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Map a non-success backend status to the matching variant.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            400 => Self::BadRequest(message),
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::UnprocessableEntity(message),
            500..=599 => Self::Dependency(message),
            _ => Self::Internal(message),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        Self::Dependency(format!("Backend request failed: {error}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::Internal(format!("Invalid JSON: {error}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::Internal(format!("I/O error: {error}"))
    }
}

impl From<FieldErrors> for AppError {
    fn from(errors: FieldErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Client-side field errors keyed by wire field name, in the order they were
/// recorded so the first one follows the form's field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<(String, String)>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `message` unless the field already has one.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        if !self.contains(field) {
            self.0.push((field.to_string(), message.into()));
        }
    }

    pub fn require(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.add(field, format!("{field} is required."));
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == field)
            .map(|(_, message)| message.as_str())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|(key, _)| key == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn first_message(&self) -> Option<&str> {
        self.0.first().map(|(_, message)| message.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

/// `day_of_month` → `dayOfMonth`, matching the JSON bodies the inputs
/// serialize to. Struct-level keys such as `__all__` pass through.
fn wire_field_name(field: &str) -> String {
    if field.starts_with('_') {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|(left, _), (right, _)| left.cmp(right));

        let mut out = FieldErrors::new();
        for (field, field_errors) in fields {
            let field = wire_field_name(&field);
            let message = field_errors
                .first()
                .and_then(|error| error.message.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| format!("{field} is invalid."));
            out.add(&field, message);
        }
        out
    }
}
