use crate::errors::AuthError;
use crate::handlers::auth::MessageResponse;
use crate::models::user::{BriefUser, Claims, User};
use crate::pagination::PageRequest;
use crate::service::{AuthService, UpdateUserInput};
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub message: String,
    pub data: User,
}

#[derive(Serialize, ToSchema)]
pub struct PageMeta {
    pub page: u64,
    pub limit: u64,
}

#[derive(Serialize, ToSchema)]
pub struct BriefUsersResponse {
    pub message: String,
    pub data: Vec<BriefUser>,
    pub meta: PageMeta,
}

#[derive(Deserialize, IntoParams)]
pub struct ListUsersQuery {
    // Raw strings so bad values map to the invalid-number error instead of
    // a generic deserialization failure.
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub password: Option<String>,
}

/// Fetch the authenticated user's own record
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "User retrieved", body = UserResponse),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn get_single_user(
    service: web::Data<AuthService>,
    claims: web::ReqData<Claims>,
) -> Result<HttpResponse, AuthError> {
    let user = service.get_single_user(&claims.sub).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        message: "success getting user".to_string(),
        data: user,
    }))
}

/// List brief user projections, paginated
#[utoipa::path(
    get,
    path = "/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users retrieved", body = BriefUsersResponse),
        (status = 400, description = "Invalid page or limit")
    ),
    tag = "Accounts"
)]
pub async fn get_brief_users(
    service: web::Data<AuthService>,
    query: web::Query<ListUsersQuery>,
) -> Result<HttpResponse, AuthError> {
    let page = PageRequest::from_raw(query.page.as_deref(), query.limit.as_deref())?;

    let users = service.get_brief_users(page).await?;

    Ok(HttpResponse::Ok().json(BriefUsersResponse {
        message: "success get users".to_string(),
        data: users,
        meta: PageMeta {
            page: page.page,
            limit: page.limit,
        },
    }))
}

/// Update the authenticated user's own record
#[utoipa::path(
    patch,
    path = "/users/me",
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = MessageResponse),
        (status = 400, description = "Invalid input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Username already taken")
    ),
    security(("bearer_auth" = [])),
    tag = "Accounts"
)]
pub async fn update_user(
    service: web::Data<AuthService>,
    claims: web::ReqData<Claims>,
    payload: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, AuthError> {
    if payload.username.is_none() && payload.display_name.is_none() && payload.password.is_none() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "At least one field (username, display_name or password) must be provided"
        })));
    }

    if let Some(ref username) = payload.username {
        if username.len() < 3 {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Username must be at least 3 characters"
            })));
        }
    }

    if let Some(ref password) = payload.password {
        if password.len() < 8 {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Password must be at least 8 characters"
            })));
        }
    }

    let payload = payload.into_inner();
    service
        .update_user(
            &claims.sub,
            UpdateUserInput {
                username: payload.username,
                display_name: payload.display_name,
                password: payload.password,
            },
        )
        .await?;

    info!(user_id = %claims.sub, "User updated profile");

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "success update user".to_string(),
    }))
}
