use crate::error::{AppError, AppResult};
use crate::repository::ApiClient;
use crate::routes::Route;
use crate::schemas::{validate_input, LoginInput, LoginResponse, User};

/// Exchange credentials for an access token and load the profile.
pub async fn login(client: &ApiClient, input: &LoginInput) -> AppResult<User> {
    validate_input(input)?;
    let response: LoginResponse = client.post("/auth/login", input).await?;
    if response.access_token.trim().is_empty() {
        return Err(AppError::Dependency(
            "Login response did not include an access token.".to_string(),
        ));
    }
    let session = client.session();
    session.set_token(&response.access_token)?;

    let user = match response.user {
        Some(user) => user,
        None => me(client).await?,
    };
    session.set_user(user.clone());
    session.schedule_redirect(Route::Dashboard, std::time::Duration::ZERO);
    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Signed in");
    Ok(user)
}

pub async fn me(client: &ApiClient) -> AppResult<User> {
    let user: User = client.get("/auth/me").await?;
    client.session().set_user(user.clone());
    Ok(user)
}

pub fn logout(client: &ApiClient) -> AppResult<()> {
    client.session().clear()?;
    client
        .session()
        .schedule_redirect(Route::Login, std::time::Duration::ZERO);
    tracing::info!("Signed out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::{login, logout, me};
    use crate::error::AppError;
    use crate::repository::test_support::{client_for, spawn_backend};
    use crate::routes::Route;
    use crate::schemas::{LoginInput, Role};
    use crate::session::tests::token_for;

    fn input(email: &str) -> LoginInput {
        LoginInput {
            email: email.to_string(),
            password: "secret".to_string(),
        }
    }

    #[tokio::test]
    async fn login_stores_token_and_fetches_profile() {
        let token = token_for("own-1", "OWNER", 3600);
        let router = Router::new()
            .route(
                "/auth/login",
                post(move |Json(body): Json<Value>| {
                    let token = token.clone();
                    async move {
                        assert_eq!(body["email"], "owner@example.com");
                        Json(json!({ "accessToken": token }))
                    }
                }),
            )
            .route(
                "/auth/me",
                get(|| async {
                    Json(json!({
                        "id": "own-1",
                        "email": "owner@example.com",
                        "firstName": "Ana",
                        "role": "OWNER"
                    }))
                }),
            );
        let client = client_for(&spawn_backend(router).await);

        let user = login(&client, &input("owner@example.com"))
            .await
            .expect("login");
        assert_eq!(user.display_name(), "Ana");
        assert_eq!(client.session().role(), Some(Role::Owner));
        assert_eq!(
            client.session().take_redirect().map(|redirect| redirect.to),
            Some(Route::Dashboard)
        );

        logout(&client).expect("logout");
        assert!(!client.session().is_authenticated());
    }

    #[tokio::test]
    async fn invalid_email_never_reaches_the_backend() {
        let client = client_for("http://127.0.0.1:9");
        let error = login(&client, &input("not-an-email"))
            .await
            .expect_err("rejected");
        assert!(matches!(error, AppError::Validation(errors) if errors.contains("email")));
    }

    #[tokio::test]
    async fn rejected_profile_request_clears_session() {
        let router = Router::new().route(
            "/auth/me",
            get(|| async { (StatusCode::UNAUTHORIZED, Json(json!({ "message": "expired" }))) }),
        );
        let client = client_for(&spawn_backend(router).await);
        client
            .session()
            .set_token(&token_for("ten-1", "TENANT", 3600))
            .expect("token");

        let error = me(&client).await.expect_err("unauthorized");
        assert!(error.is_unauthorized());
        assert!(client.session().token().is_none());
        assert_eq!(
            client.session().pending_redirect().map(|redirect| redirect.to),
            Some(Route::Login)
        );
    }
}
