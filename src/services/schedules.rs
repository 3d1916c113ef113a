use crate::error::AppResult;
use crate::repository::ApiClient;
use crate::schemas::{
    validate_input, CreateScheduleInput, Payment, PaymentSchedule, Property, RecordPaymentInput,
    Rental, User,
};

/// Everything the schedules page renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchedulesPage {
    pub schedules: Vec<PaymentSchedule>,
    pub properties: Vec<Property>,
    pub tenants: Vec<User>,
}

/// Fetch schedules, properties and tenants concurrently. Any failure fails
/// the whole page.
pub async fn load_schedules_page(client: &ApiClient) -> AppResult<SchedulesPage> {
    let (schedules, properties, tenants) = tokio::try_join!(
        list_schedules(client),
        list_properties(client),
        list_tenants(client),
    )?;
    tracing::debug!(
        schedules = schedules.len(),
        properties = properties.len(),
        tenants = tenants.len(),
        "Schedules page loaded"
    );
    Ok(SchedulesPage {
        schedules,
        properties,
        tenants,
    })
}

pub async fn list_schedules(client: &ApiClient) -> AppResult<Vec<PaymentSchedule>> {
    client.get("/payments/schedules").await
}

pub async fn list_properties(client: &ApiClient) -> AppResult<Vec<Property>> {
    client.get("/properties").await
}

pub async fn list_rentals(client: &ApiClient) -> AppResult<Vec<Rental>> {
    client.get("/rentals").await
}

pub async fn list_tenants(client: &ApiClient) -> AppResult<Vec<User>> {
    client.get("/users/tenants").await
}

pub async fn list_payments(client: &ApiClient) -> AppResult<Vec<Payment>> {
    client.get("/payments").await
}

pub async fn create_schedule(
    client: &ApiClient,
    input: &CreateScheduleInput,
) -> AppResult<PaymentSchedule> {
    validate_input(input)?;
    let schedule: PaymentSchedule = client.post("/payments/schedules", input).await?;
    tracing::info!(
        schedule_id = %schedule.id,
        tenant_id = %input.tenant_id,
        property_id = %input.property_id,
        "Payment schedule created"
    );
    Ok(schedule)
}

/// Mark a payment as received. The backend decides the resulting status.
pub async fn record_payment(
    client: &ApiClient,
    payment_id: &str,
    input: &RecordPaymentInput,
) -> AppResult<Payment> {
    validate_input(input)?;
    let path = format!("/payments/{}/record", path_segment(payment_id)?);
    let payment: Payment = client.post(&path, input).await?;
    tracing::info!(
        payment_id = %payment.id,
        status = payment.status.as_str(),
        "Payment recorded"
    );
    Ok(payment)
}

pub async fn archive_payment(client: &ApiClient, payment_id: &str) -> AppResult<Payment> {
    let path = format!("/payments/{}/archive", path_segment(payment_id)?);
    client.put(&path, &serde_json::json!({})).await
}

/// Identifiers are interpolated into paths, so they must be a single segment
/// that does not navigate (`.` and `..` are rejected).
pub(crate) fn path_segment(id: &str) -> AppResult<&str> {
    let id = id.trim();
    if id.is_empty() || matches!(id, "." | "..") || id.contains(['/', '\\', '?', '#', '%']) {
        return Err(crate::error::AppError::BadRequest(format!(
            "Invalid identifier '{id}'."
        )));
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::routing::{get, post, put};
    use axum::{Json, Router};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::{archive_payment, create_schedule, load_schedules_page, path_segment, record_payment};
    use crate::error::AppError;
    use crate::repository::test_support::{client_for, spawn_backend};
    use crate::schemas::{CreateScheduleInput, PaymentStatus, RecordPaymentInput};

    fn payment_json(id: &str, status: &str) -> Value {
        json!({
            "id": id,
            "amount": "1200.00",
            "dueDate": "2026-10-05T00:00:00.000Z",
            "status": status,
            "isArchived": false,
            "paymentSchedule": {
                "id": "sch-1",
                "tenant": { "id": "ten-1" },
                "property": { "id": "prop-1" }
            }
        })
    }

    fn schedule_input() -> CreateScheduleInput {
        CreateScheduleInput {
            start_date: NaiveDate::from_ymd_opt(2026, 1, 1).expect("date"),
            end_date: NaiveDate::from_ymd_opt(2026, 12, 31).expect("date"),
            monthly_amount: 1200.0,
            day_of_month: 5,
            property_id: "prop-1".to_string(),
            tenant_id: "ten-1".to_string(),
        }
    }

    #[tokio::test]
    async fn page_loader_fetches_all_three_lists() {
        let router = Router::new()
            .route(
                "/payments/schedules",
                get(|| async {
                    Json(json!([{
                        "id": "sch-1",
                        "startDate": "2026-01-01",
                        "endDate": "2026-12-31",
                        "monthlyAmount": 1200,
                        "dayOfMonth": 5,
                        "isActive": true
                    }]))
                }),
            )
            .route(
                "/properties",
                get(|| async { Json(json!([{ "id": "prop-1", "name": "Loft" }])) }),
            )
            .route(
                "/users/tenants",
                get(|| async {
                    Json(json!([{ "id": "ten-1", "email": "t@example.com", "role": "TENANT" }]))
                }),
            );
        let client = client_for(&spawn_backend(router).await);

        let page = load_schedules_page(&client).await.expect("page");
        assert_eq!(page.schedules.len(), 1);
        assert_eq!(page.schedules[0].monthly_amount, 1200.0);
        assert_eq!(page.properties[0].name.as_deref(), Some("Loft"));
        assert_eq!(page.tenants[0].id, "ten-1");
    }

    #[tokio::test]
    async fn page_loader_fails_when_one_list_fails() {
        let router = Router::new()
            .route("/payments/schedules", get(|| async { Json(json!([])) }))
            .route("/properties", get(|| async { Json(json!([])) }))
            .route(
                "/users/tenants",
                get(|| async { (StatusCode::FORBIDDEN, Json(json!({ "message": "Owners only" }))) }),
            );
        let client = client_for(&spawn_backend(router).await);

        let error = load_schedules_page(&client).await.expect_err("forbidden");
        assert!(matches!(error, AppError::Forbidden(message) if message == "Owners only"));
    }

    #[tokio::test]
    async fn create_schedule_posts_camel_case_body() {
        let router = Router::new().route(
            "/payments/schedules",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["monthlyAmount"], 1200.0);
                assert_eq!(body["dayOfMonth"], 5);
                assert_eq!(body["startDate"], "2026-01-01");
                Json(json!({
                    "id": "sch-9",
                    "startDate": body["startDate"],
                    "endDate": body["endDate"],
                    "monthlyAmount": body["monthlyAmount"],
                    "dayOfMonth": body["dayOfMonth"],
                }))
            }),
        );
        let client = client_for(&spawn_backend(router).await);

        let schedule = create_schedule(&client, &schedule_input())
            .await
            .expect("created");
        assert_eq!(schedule.id, "sch-9");
    }

    #[tokio::test]
    async fn invalid_schedule_is_rejected_locally() {
        let client = client_for("http://127.0.0.1:9");
        let mut input = schedule_input();
        input.day_of_month = 0;
        input.monthly_amount = 0.0;
        let error = create_schedule(&client, &input).await.expect_err("invalid");
        let AppError::Validation(errors) = error else {
            panic!("expected field errors");
        };
        let messages: Vec<&str> = errors.iter().map(|(_, message)| message).collect();
        assert_eq!(errors.len(), 2);
        assert!(messages.contains(&"Day of month must be between 1 and 31."));
        assert!(messages.contains(&"Monthly amount must be positive."));
        assert!(errors.contains("dayOfMonth"));
        assert!(errors.contains("monthlyAmount"));
    }

    #[tokio::test]
    async fn records_and_archives_payments() {
        let router = Router::new()
            .route(
                "/payments/{id}/record",
                post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                    assert_eq!(body["paymentMethod"], "TRANSFER");
                    assert!(body.get("notes").is_none());
                    Json(payment_json(&id, "PAID"))
                }),
            )
            .route(
                "/payments/{id}/archive",
                put(|Path(id): Path<String>| async move {
                    let mut payment = payment_json(&id, "PAID");
                    payment["isArchived"] = json!(true);
                    Json(payment)
                }),
            );
        let client = client_for(&spawn_backend(router).await);

        let input = RecordPaymentInput {
            amount: 1200.0,
            payment_method: "TRANSFER".to_string(),
            transaction_id: Some("tx-1".to_string()),
            notes: None,
        };
        let payment = record_payment(&client, "pay-1", &input)
            .await
            .expect("recorded");
        assert_eq!(payment.status, PaymentStatus::Paid);
        assert_eq!(payment.tenant_id(), "ten-1");

        let archived = archive_payment(&client, "pay-1").await.expect("archived");
        assert!(archived.is_archived);
    }

    #[test]
    fn identifiers_must_be_single_segments() {
        assert_eq!(path_segment(" pay-1 ").expect("valid"), "pay-1");
        assert!(path_segment("").is_err());
        assert!(path_segment("../admin").is_err());
        assert!(path_segment(".").is_err());
        assert!(path_segment("..").is_err());
        assert!(path_segment(" .. ").is_err());
        assert!(path_segment("%2e%2e").is_err());
        assert!(path_segment("pay\\1").is_err());
        assert_eq!(path_segment("v1.2").expect("dots inside are fine"), "v1.2");
    }

    #[tokio::test]
    async fn dot_segments_never_reach_the_backend() {
        let client = client_for("http://127.0.0.1:9");
        let error = archive_payment(&client, "..").await.expect_err("rejected");
        assert!(matches!(error, AppError::BadRequest(_)));
        let input = RecordPaymentInput {
            amount: 10.0,
            payment_method: "CASH".to_string(),
            transaction_id: None,
            notes: None,
        };
        let error = record_payment(&client, ".", &input).await.expect_err("rejected");
        assert!(matches!(error, AppError::BadRequest(_)));
    }
}
