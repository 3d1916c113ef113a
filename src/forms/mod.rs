pub mod coerce;
pub mod property;
pub mod rental;
pub mod wizard;

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{AppError, AppResult, FieldErrors, GENERIC_ERROR_MESSAGE};
use crate::repository::{build_multipart, ApiClient, Attachment};
use crate::routes::Route;

pub use property::{PropertyField, PropertyFormData, PropertyPayload, PropertyStep};
pub use rental::{RentalField, RentalFormData, RentalPayload, RentalStep};
pub use wizard::{StepValidator, Wizard, WizardStep};

/// Raw input exactly as the user typed or toggled it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Flag(flag) => flag.to_string(),
            Self::List(items) => items.join(","),
        }
    }

    pub fn into_flag(self) -> bool {
        match self {
            Self::Flag(flag) => flag,
            Self::Text(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            ),
            Self::List(items) => !items.is_empty(),
        }
    }

    pub fn into_list(self) -> Vec<String> {
        match self {
            Self::List(items) => items,
            Self::Text(text) => text
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            Self::Flag(_) => Vec::new(),
        }
    }
}

/// A staging record plus everything needed to turn it into a backend write.
pub trait FormModel: Default {
    type Field: Copy + Eq + Debug;
    type Payload: Serialize;
    type Created: DeserializeOwned;

    const ENDPOINT: &'static str;
    const SUCCESS_ROUTE: Route;

    fn set(&mut self, field: Self::Field, value: FieldValue);

    /// Coerce and check the staged values.
    fn to_payload(&self) -> Result<Self::Payload, FieldErrors>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Success,
    Error(String),
}

/// Outbound body chosen by the submit pipeline.
pub enum SubmitBody<P> {
    Json(P),
    Multipart(reqwest::multipart::Form),
}

impl<P> SubmitBody<P> {
    pub fn is_multipart(&self) -> bool {
        matches!(self, Self::Multipart(_))
    }
}

/// `Idle → Submitting → {Success | Error}`. An edit after an error returns
/// to `Idle`; `Success` is terminal.
pub struct FormController<M: FormModel> {
    data: M,
    attachments: Vec<Attachment>,
    status: FormStatus,
    field_errors: FieldErrors,
    created: Option<M::Created>,
}

impl<M: FormModel> Default for FormController<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: FormModel> FormController<M> {
    pub fn new() -> Self {
        Self {
            data: M::default(),
            attachments: Vec::new(),
            status: FormStatus::Idle,
            field_errors: FieldErrors::new(),
            created: None,
        }
    }

    pub fn data(&self) -> &M {
        &self.data
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        self.status == FormStatus::Success
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            FormStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn created(&self) -> Option<&M::Created> {
        self.created.as_ref()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Store a raw value. Returns `false` once the form has been submitted
    /// successfully or while a submission is in flight.
    pub fn handle_change(&mut self, field: M::Field, value: FieldValue) -> bool {
        match self.status {
            FormStatus::Success | FormStatus::Submitting => return false,
            FormStatus::Error(_) => {
                self.status = FormStatus::Idle;
                self.field_errors = FieldErrors::new();
            }
            FormStatus::Idle => {}
        }
        self.data.set(field, value);
        true
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> bool {
        if matches!(self.status, FormStatus::Success | FormStatus::Submitting) {
            return false;
        }
        self.attachments.push(attachment);
        true
    }

    pub fn remove_attachment(&mut self, file_name: &str) {
        self.attachments
            .retain(|attachment| attachment.file_name != file_name);
    }

    /// First half of a submission: coerce, pick JSON or multipart and enter
    /// `Submitting`. Client-side field errors put the form in `Error`.
    pub fn begin_submit(&mut self) -> AppResult<SubmitBody<M::Payload>> {
        match self.status {
            FormStatus::Submitting => {
                return Err(AppError::Conflict(
                    "This form is already being submitted.".to_string(),
                ))
            }
            FormStatus::Success => {
                return Err(AppError::Conflict(
                    "This form has already been submitted.".to_string(),
                ))
            }
            FormStatus::Idle | FormStatus::Error(_) => {}
        }

        let payload = match self.data.to_payload() {
            Ok(payload) => payload,
            Err(errors) => {
                self.status = FormStatus::Error(
                    errors
                        .first_message()
                        .unwrap_or(GENERIC_ERROR_MESSAGE)
                        .to_string(),
                );
                self.field_errors = errors.clone();
                return Err(AppError::Validation(errors));
            }
        };

        let body = if self.attachments.is_empty() {
            SubmitBody::Json(payload)
        } else {
            SubmitBody::Multipart(build_multipart(&payload, &self.attachments)?)
        };
        self.field_errors = FieldErrors::new();
        self.status = FormStatus::Submitting;
        Ok(body)
    }

    /// Second half: record the backend outcome.
    pub fn finish_submit(&mut self, outcome: AppResult<M::Created>) -> AppResult<()> {
        match outcome {
            Ok(created) => {
                self.created = Some(created);
                self.status = FormStatus::Success;
                Ok(())
            }
            Err(error) => {
                self.status = FormStatus::Error(error.user_message());
                Err(error)
            }
        }
    }

    /// Full pipeline against the backend. On success the session gets a
    /// delayed redirect to the form's listing page.
    pub async fn submit(&mut self, client: &ApiClient) -> AppResult<&M::Created> {
        let body = self.begin_submit()?;
        let multipart = body.is_multipart();
        let outcome = match body {
            SubmitBody::Json(payload) => client.post::<_, M::Created>(M::ENDPOINT, &payload).await,
            SubmitBody::Multipart(form) => client.post_multipart::<M::Created>(M::ENDPOINT, form).await,
        };

        match &outcome {
            Ok(_) => tracing::info!(endpoint = M::ENDPOINT, multipart, "Form submitted"),
            Err(error) => tracing::warn!(endpoint = M::ENDPOINT, error = %error, "Form submission failed"),
        }
        self.finish_submit(outcome)?;

        client
            .session()
            .schedule_redirect(M::SUCCESS_ROUTE, client.config().redirect_delay());
        self.created
            .as_ref()
            .ok_or_else(|| AppError::Internal("Created entity missing after success.".to_string()))
    }
}
