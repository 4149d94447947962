pub mod authz;
pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::ip_rate_limit_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::authz::{AuthContext, ScopedCollection};
use crate::config::BackofficeConfig;
use crate::models::{Booking, Employee, Invoice, User};
use crate::services::{AccessAuditService, AuthService, MongoDb, RevocationStore, TokenService};

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::auth::refresh,
        handlers::users::get_me,
        handlers::users::create_user,
        handlers::bookings::list_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::create_booking,
        handlers::bookings::update_booking_status,
        handlers::bookings::delete_booking,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::create_invoice,
        handlers::invoices::update_invoice_status,
        handlers::invoices::invoice_summary,
        handlers::employees::list_employees,
        handlers::employees::get_employee,
        handlers::employees::create_employee,
        handlers::establishments::create_establishment,
        handlers::establishments::list_establishments,
        handlers::establishments::assign_user,
        handlers::audit::get_violations,
        handlers::audit::get_user_activity,
        handlers::audit::get_resource_access_history,
        handlers::audit::get_suspicious_activity,
    ),
    components(
        schemas(
            dtos::ErrorResponse,
            dtos::auth::LoginRequest,
            dtos::auth::LogoutRequest,
            dtos::auth::RefreshRequest,
            dtos::users::CreateUserRequest,
            dtos::bookings::CreateBookingRequest,
            dtos::bookings::UpdateBookingStatusRequest,
            dtos::invoices::CreateInvoiceRequest,
            dtos::invoices::UpdateInvoiceStatusRequest,
            dtos::employees::CreateEmployeeRequest,
            dtos::establishments::CreateEstablishmentRequest,
            dtos::establishments::AssignUserRequest,
            handlers::bookings::BookingListResponse,
            handlers::invoices::InvoiceListResponse,
            services::token::TokenResponse,
            models::Booking,
            models::BookingStatus,
            models::Invoice,
            models::InvoiceStatus,
            models::Employee,
            models::Establishment,
            models::SanitizedUser,
            models::AccessLogEntry,
            models::AccessAction,
            authz::Role,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Session and token management"),
        (name = "Users", description = "Back-office accounts"),
        (name = "Bookings", description = "Establishment-scoped bookings"),
        (name = "Invoicing", description = "Establishment-scoped invoicing"),
        (name = "Payroll", description = "Establishment-scoped payroll records"),
        (name = "Establishments", description = "Establishment administration"),
        (name = "Audit", description = "Access audit log queries"),
        (name = "Observability", description = "Service health"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: BackofficeConfig,
    pub db: MongoDb,
    pub tokens: TokenService,
    pub revocations: Arc<dyn RevocationStore>,
    pub audit: AccessAuditService,
    pub auth_service: AuthService,
    pub login_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
    pub ip_rate_limiter: service_core::middleware::rate_limit::IpRateLimiter,
}

impl AppState {
    /// Tenant-data collections are only reachable through the scope
    /// injector, bound to the request's authorization context.
    pub fn bookings(&self, ctx: &AuthContext) -> ScopedCollection<Booking> {
        ScopedCollection::new(self.db.bookings(), ctx.clone(), self.audit.clone())
    }

    pub fn invoices(&self, ctx: &AuthContext) -> ScopedCollection<Invoice> {
        ScopedCollection::new(self.db.invoices(), ctx.clone(), self.audit.clone())
    }

    pub fn employees(&self, ctx: &AuthContext) -> ScopedCollection<Employee> {
        ScopedCollection::new(self.db.employees(), ctx.clone(), self.audit.clone())
    }

    pub fn users(&self, ctx: &AuthContext) -> ScopedCollection<User> {
        ScopedCollection::new(self.db.users(), ctx.clone(), self.audit.clone())
    }
}

pub async fn build_router(state: AppState) -> Result<Router, AppError> {
    // Establishment-scoped data routes: behind the bootstrap guard so an
    // unassigned scoped principal cannot reach any listing path.
    let data_routes = Router::new()
        .route(
            "/bookings",
            get(handlers::bookings::list_bookings).post(handlers::bookings::create_booking),
        )
        .route(
            "/bookings/:id",
            get(handlers::bookings::get_booking)
                .patch(handlers::bookings::update_booking_status)
                .delete(handlers::bookings::delete_booking),
        )
        .route(
            "/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice),
        )
        .route("/invoices/summary", get(handlers::invoices::invoice_summary))
        .route(
            "/invoices/:id",
            get(handlers::invoices::get_invoice).patch(handlers::invoices::update_invoice_status),
        )
        .route(
            "/employees",
            get(handlers::employees::list_employees).post(handlers::employees::create_employee),
        )
        .route("/employees/:id", get(handlers::employees::get_employee))
        .route("/users", post(handlers::users::create_user))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::require_establishment,
        ));

    // Unrestricted-only surfaces.
    let admin_routes = Router::new()
        .route(
            "/establishments",
            get(handlers::establishments::list_establishments)
                .post(handlers::establishments::create_establishment),
        )
        .route("/audit/violations", get(handlers::audit::get_violations))
        .route(
            "/audit/users/:user_id/activity",
            get(handlers::audit::get_user_activity),
        )
        .route(
            "/audit/users/:user_id/suspicious",
            get(handlers::audit::get_suspicious_activity),
        )
        .route(
            "/audit/resources/:resource_type/:resource_id",
            get(handlers::audit::get_resource_access_history),
        )
        .layer(from_fn_with_state(state.clone(), middleware::require_admin));

    // Authenticated surface: data + admin + the bootstrap-reachable
    // routes (profile, establishment assignment).
    let authed_routes = Router::new()
        .merge(data_routes)
        .merge(admin_routes)
        .route("/users/me", get(handlers::users::get_me))
        .route(
            "/establishments/:id/assign",
            post(handlers::establishments::assign_user),
        )
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware));

    // Login gets its own tighter limiter on top of the global one.
    let login_limiter = state.login_rate_limiter.clone();
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(login_limiter, ip_rate_limit_middleware));

    let ip_limiter = state.ip_rate_limiter.clone();

    let mut app = Router::new().route("/health", get(health_check));

    let swagger_enabled = match state.config.environment {
        config::Environment::Dev => true,
        config::Environment::Prod => state.config.swagger.enabled == config::SwaggerMode::Public,
    };

    if swagger_enabled {
        app =
            app.merge(SwaggerUi::new("/docs").url("/.well-known/openapi.json", ApiDoc::openapi()));
    } else {
        app = app.route(
            "/.well-known/openapi.json",
            get(|| async { axum::Json(ApiDoc::openapi()) }),
        );
    }

    let app = app
        .merge(login_route)
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .merge(authed_routes)
        .with_state(state.clone())
        // Global IP rate limiting
        .layer(from_fn_with_state(ip_limiter, ip_rate_limit_middleware))
        // Add tracing layer
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        // Add CORS layer
        .layer(
            CorsLayer::new()
                .allow_origin(
                    state
                        .config
                        .security
                        .allowed_origins
                        .iter()
                        .map(|o| {
                            o.parse::<axum::http::HeaderValue>().unwrap_or_else(|e| {
                                tracing::error!(
                                    "Invalid CORS origin '{}': {}. Using fallback.",
                                    o,
                                    e
                                );
                                axum::http::HeaderValue::from_static("*")
                            })
                        })
                        .collect::<Vec<axum::http::HeaderValue>>(),
                )
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PATCH,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::AUTHORIZATION,
                    axum::http::header::CONTENT_TYPE,
                ]),
        );

    Ok(app)
}

/// Service health check
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy"),
        (status = 500, description = "A dependency is unhealthy")
    ),
    tag = "Observability"
)]
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "MongoDB health check failed");
        e
    })?;

    state.revocations.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Revocation store health check failed");
        AppError::InternalError(e)
    })?;

    Ok(axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "mongodb": "up",
            "revocation_store": "up"
        }
    })))
}
