mod config;
mod db;
mod errors;
mod handlers;
mod middleware;
mod models;
mod pagination;
mod service;
mod utils;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer, ResponseError};
use config::Config;
use db::user_repository::UserRepository;
use db::Database;
use dotenv::dotenv;
use errors::AuthError;
use middleware::rate_limit::RateLimitMiddleware;
use service::AuthService;
use std::env;
use std::time::Duration;
use tracing::info;
use tracing_actix_web::TracingLogger;
use utils::auth::TokenIssuer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

const DB_CONNECT_RETRIES: u32 = 3;
const DB_CONNECT_DELAY: Duration = Duration::from_secs(5);

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::auth::sign_up,
        handlers::auth::log_in,
        handlers::users::get_single_user,
        handlers::users::get_brief_users,
        handlers::users::update_user,
    ),
    components(
        schemas(
            handlers::health::HealthResponse,
            handlers::auth::SignUpRequest,
            handlers::auth::LogInRequest,
            handlers::auth::MessageResponse,
            handlers::auth::LogInResponse,
            handlers::users::UserResponse,
            handlers::users::BriefUsersResponse,
            handlers::users::PageMeta,
            handlers::users::UpdateUserRequest,
            models::user::User,
            models::user::BriefUser,
            models::user::Claims,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoints"),
        (name = "Accounts", description = "Account registration, sessions and profiles")
    ),
    modifiers(&SecurityAddon)
)]
struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Enter your session token"))
                        .build(),
                ),
            );
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize tracing subscriber for structured logging
    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .json()
        .init();

    let config = Config::from_env();

    // Bounded startup retry; per-request code never retries the store.
    let database = Database::connect(&config.db_path, DB_CONNECT_RETRIES, DB_CONNECT_DELAY)
        .expect("Failed to open database");
    info!(db_path = %config.db_path, "Database opened");

    let token_issuer = TokenIssuer::new(
        &config.jwt_secret,
        chrono::Duration::hours(config.token_ttl_hours),
    );

    let bind_address = config.bind_address();
    info!(bind_address = %bind_address, "Starting account service");
    info!("Available endpoints:");
    info!("   GET   /health        - Health check (public)");
    info!("   POST  /users         - Sign up (public)");
    info!("   POST  /sessions      - Log in (public, rate limited)");
    info!("   GET   /users         - List brief users (public)");
    info!("   GET   /users/me      - Get own record (protected)");
    info!("   PATCH /users/me      - Update own record (protected)");
    info!(
        swagger_url = format!("http://{}/swagger-ui/", bind_address),
        "Swagger UI available"
    );

    HttpServer::new(move || {
        let user_repo =
            UserRepository::new(&database).expect("Failed to open user trees");
        let auth_service = AuthService::new(user_repo, token_issuer.clone());

        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PATCH", "DELETE"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        // Malformed payloads surface as the bad-request-body error shape.
        let json_config = web::JsonConfig::default().error_handler(|err, _req| {
            actix_web::error::InternalError::from_response(
                err,
                AuthError::BadRequestBody.error_response(),
            )
            .into()
        });

        let openapi = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(auth_service))
            .app_data(web::Data::new(token_issuer.clone()))
            .app_data(web::Data::new(config.clone()))
            .app_data(json_config)
            .wrap(TracingLogger::default())
            .wrap(cors)
            // Swagger UI
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            // Public routes
            .route("/health", web::get().to(handlers::health::health))
            // Login with rate limiting (5 requests per minute per IP)
            .service(
                web::resource("/sessions")
                    .wrap(RateLimitMiddleware::new(5))
                    .route(web::post().to(handlers::auth::log_in)),
            )
            .service(
                web::scope("/users")
                    // Identity routes resolve the caller from verified
                    // claims only; the middleware is what puts them there.
                    .service(
                        web::scope("/me")
                            .wrap(middleware::auth::AuthMiddleware)
                            .route("", web::get().to(handlers::users::get_single_user))
                            .route("", web::patch().to(handlers::users::update_user)),
                    )
                    .route("", web::post().to(handlers::auth::sign_up))
                    .route("", web::get().to(handlers::users::get_brief_users)),
            )
    })
    .bind(&bind_address)?
    .run()
    .await
}
