use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

use crate::error::{AppError, FieldErrors};

pub fn validate_input<T: Validate>(input: &T) -> Result<(), AppError> {
    input
        .validate()
        .map_err(|errors| AppError::Validation(FieldErrors::from(errors)))
}

pub fn serialize_to_map<T>(value: &T) -> Map<String, Value>
where
    T: Serialize,
{
    let json = serde_json::to_value(value).unwrap_or_else(|_| Value::Object(Map::new()));
    json.as_object().cloned().unwrap_or_default()
}

pub fn remove_nulls(mut map: Map<String, Value>) -> Map<String, Value> {
    map.retain(|_, value| !value.is_null());
    map
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Late,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Late => "LATE",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "PAID" => Some(Self::Paid),
            "LATE" => Some(Self::Late),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Owner,
    Tenant,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Tenant => "TENANT",
            Self::Admin => "ADMIN",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "OWNER" => Some(Self::Owner),
            "TENANT" => Some(Self::Tenant),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn manages_properties(self) -> bool {
        matches!(self, Self::Owner | Self::Admin)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub role: Role,
}

impl User {
    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            Some(&self.email),
        )
    }
}

/// Tenant or owner as embedded inside payment and rental rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartySummary {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl PartySummary {
    pub fn display_name(&self) -> String {
        display_name(
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.email.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySummary {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

impl PropertySummary {
    pub fn label(&self) -> String {
        self.name
            .as_deref()
            .or(self.address.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(&self.id)
            .to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentScheduleRef {
    #[serde(default, deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub tenant: PartySummary,
    #[serde(default)]
    pub property: PropertySummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(deserialize_with = "de_date")]
    pub due_date: NaiveDate,
    pub status: PaymentStatus,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub paid_amount: Option<f64>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub payment_schedule: PaymentScheduleRef,
}

impl Payment {
    pub fn tenant_id(&self) -> &str {
        &self.payment_schedule.tenant.id
    }

    pub fn property_id(&self) -> &str {
        &self.payment_schedule.property.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSchedule {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(deserialize_with = "de_date")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "de_date")]
    pub end_date: NaiveDate,
    #[serde(deserialize_with = "de_amount")]
    pub monthly_amount: f64,
    pub day_of_month: u8,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub property: PropertySummary,
    #[serde(default)]
    pub tenant: PartySummary,
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// Property as returned by the backend. Only the fields the client reads
/// are typed, the rest is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub postal_code: Option<String>,
    #[serde(default)]
    pub property_type: Option<String>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub surface: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_id_opt")]
    pub property_id: Option<String>,
    #[serde(default, deserialize_with = "de_id_opt")]
    pub tenant_id: Option<String>,
    #[serde(default, deserialize_with = "de_date_opt")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_date_opt")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub rent_amount: Option<f64>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub charges_amount: Option<f64>,
    #[serde(default, deserialize_with = "de_amount_opt")]
    pub deposit_amount: Option<f64>,
    #[serde(default)]
    pub property: Option<PropertySummary>,
    #[serde(default)]
    pub tenant: Option<PartySummary>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    Receipt,
    Lease,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub kind: DocumentKind,
    pub file_name: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_id_opt")]
    pub payment_id: Option<String>,
    #[serde(default, deserialize_with = "de_id_opt")]
    pub rental_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email(message = "Please enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "access_token", alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_schedule_dates"))]
pub struct CreateScheduleInput {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[validate(range(exclusive_min = 0.0, message = "Monthly amount must be positive."))]
    pub monthly_amount: f64,
    #[validate(range(min = 1, max = 31, message = "Day of month must be between 1 and 31."))]
    pub day_of_month: u8,
    #[validate(length(min = 1, message = "Property is required."))]
    pub property_id: String,
    #[validate(length(min = 1, message = "Tenant is required."))]
    pub tenant_id: String,
}

fn validate_schedule_dates(input: &CreateScheduleInput) -> Result<(), validator::ValidationError> {
    if input.end_date < input.start_date {
        let mut error = validator::ValidationError::new("end_before_start");
        error.message = Some("End date must be after start date.".into());
        return Err(error);
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentInput {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be positive."))]
    pub amount: f64,
    #[validate(length(min = 1, message = "Payment method is required."))]
    pub payment_method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn display_name(first: Option<&str>, last: Option<&str>, fallback: Option<&str>) -> String {
    let full = [first, last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if !full.is_empty() {
        return full;
    }
    fallback
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

/// Amounts arrive as JSON numbers or as decimal strings ("1200.00").
fn number_from_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}

/// Identifiers arrive as strings or, from some endpoints, as integers.
fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {value}")))
}

pub(crate) fn de_id_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(value) => id_from_value(&value)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier: {value}"))),
    }
}

/// Accepts `2026-10-05` as well as full timestamps such as
/// `2026-10-05T00:00:00.000Z`.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    number_from_value(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid amount: {value}")))
}

fn de_amount_opt<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_from_value))
}

fn de_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date_prefix(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {raw}")))
}

fn de_date_opt<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_date_prefix))
}
