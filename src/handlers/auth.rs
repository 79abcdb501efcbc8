use crate::errors::AuthError;
use crate::service::{AuthService, SignUpInput};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct SignUpRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LogInRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct LogInResponse {
    pub message: String,
    pub token: String,
    pub otp: String,
}

/// Create a new account
#[utoipa::path(
    post,
    path = "/users",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "User created", body = MessageResponse),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Accounts"
)]
pub async fn sign_up(
    service: web::Data<AuthService>,
    payload: web::Json<SignUpRequest>,
) -> Result<HttpResponse, AuthError> {
    info!(username = %payload.username, "Sign-up attempt");

    if payload.username.len() < 3 || payload.password.len() < 8 {
        warn!(username = %payload.username, "Sign-up failed: invalid input");
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "Username must be at least 3 characters and password at least 8."
        })));
    }

    let payload = payload.into_inner();
    let display_name = if payload.display_name.is_empty() {
        payload.username.clone()
    } else {
        payload.display_name
    };

    service
        .sign_up(SignUpInput {
            username: payload.username,
            display_name,
            password: payload.password,
        })
        .await?;

    Ok(HttpResponse::Created().json(MessageResponse {
        message: "success creating user".to_string(),
    }))
}

/// Authenticate and receive a session token plus a one-time code
#[utoipa::path(
    post,
    path = "/sessions",
    request_body = LogInRequest,
    responses(
        (status = 200, description = "Login successful", body = LogInResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Accounts"
)]
pub async fn log_in(
    service: web::Data<AuthService>,
    payload: web::Json<LogInRequest>,
) -> Result<HttpResponse, AuthError> {
    info!(username = %payload.username, "Login attempt");

    let out = service.log_in(&payload.username, &payload.password).await?;

    Ok(HttpResponse::Ok().json(LogInResponse {
        message: "success login".to_string(),
        token: out.token,
        otp: out.otp,
    }))
}
