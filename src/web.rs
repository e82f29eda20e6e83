//! Axum-based HTTP API, with optional OpenAPI (utoipa) and Swagger UI

use crate::error::OctowattError;
use crate::logging::get_logger;
use crate::service::{EnergyReport, EnergyService};
use crate::types::{FuelSelection, TimeWindow};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EnergyService>,
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SetupBody {
    pub user_id: String,
    pub api_key: String,
    pub account_number: String,
}

#[derive(Debug, Deserialize)]
pub struct EnergyParams {
    pub user_id: String,
    #[serde(default = "default_fuel")]
    pub fuel: String,
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_fuel() -> String {
    "both".to_string()
}

fn default_days() -> u32 {
    TimeWindow::LastWeek.days()
}

#[derive(Serialize)]
struct EnergyResponse {
    text: String,
    #[serde(flatten)]
    report: EnergyReport,
}

/// HTTP status of an error leaving the service
pub fn status_for(err: &OctowattError) -> StatusCode {
    match err {
        OctowattError::Validation { .. } => StatusCode::BAD_REQUEST,
        OctowattError::NotRegistered { .. } | OctowattError::NoData => StatusCode::NOT_FOUND,
        OctowattError::Auth { .. } => StatusCode::UNAUTHORIZED,
        OctowattError::Io { .. } | OctowattError::Config { .. } | OctowattError::Generic { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::BAD_GATEWAY,
    }
}

fn error_response(err: &OctowattError) -> Response {
    (
        status_for(err),
        Json(serde_json::json!({ "error": err.user_message() })),
    )
        .into_response()
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/health", responses(
    (status = 200, description = "Service is healthy")
)))]
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/version", responses((status = 200))))]
pub async fn version() -> impl IntoResponse {
    Json(serde_json::json!({ "version": env!("APP_VERSION") }))
}

#[cfg_attr(feature = "openapi", utoipa::path(post, path = "/api/setup", request_body = SetupBody, responses(
    (status = 200, description = "Credentials stored"),
    (status = 400, description = "Malformed API key or account number")
)))]
pub async fn setup(
    State(state): State<AppState>,
    body: Result<Json<SetupBody>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };
    match state
        .service
        .setup(&body.user_id, &body.api_key, &body.account_number)
        .await
    {
        Ok(message) => (StatusCode::OK, Json(serde_json::json!({ "message": message }))).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg_attr(feature = "openapi", utoipa::path(get, path = "/api/energy", responses(
    (status = 200, description = "Energy report per fuel"),
    (status = 400, description = "Invalid fuel or time window"),
    (status = 404, description = "User not set up or no data for the period"),
    (status = 502, description = "Provider failure")
)))]
pub async fn energy(
    State(state): State<AppState>,
    params: Result<Query<EnergyParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": rejection.body_text() })),
            )
                .into_response();
        }
    };
    let selection = match FuelSelection::parse(&params.fuel) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    let window = match TimeWindow::try_from(params.days) {
        Ok(w) => w,
        Err(e) => return error_response(&e),
    };

    match state
        .service
        .get_energy_data(&params.user_id, selection, window)
        .await
    {
        Ok(report) => Json(EnergyResponse {
            text: report.text(),
            report,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(feature = "openapi")]
#[derive(utoipa::OpenApi)]
#[openapi(
    paths(health, version, setup, energy),
    components(schemas(SetupBody)),
    tags((name = "octowatt", description = "Octowatt energy report API"))
)]
pub struct ApiDoc;

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/api/health", get(health))
        .route("/api/version", get(version))
        .route("/api/setup", post(setup))
        .route("/api/energy", get(energy));

    #[cfg(feature = "openapi")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/ui/openapi")
            .url("/openapi.json", <ApiDoc as utoipa::OpenApi>::openapi()),
    );

    router
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(service: Arc<EnergyService>, host: &str, port: u16) -> anyhow::Result<()> {
    let router = build_router(AppState { service });

    let logger = get_logger("web");
    logger.info(&format!(
        "Starting web server; requested host={}, port={}",
        host, port
    ));

    let addr = match host.parse::<IpAddr>() {
        Ok(ip) => SocketAddr::new(ip, port),
        Err(_) => {
            logger.warn(&format!("Invalid host '{}'; falling back to 127.0.0.1", host));
            ([127, 0, 0, 1], port).into()
        }
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    logger.info(&format!(
        "Web server listening at http://{}:{} (API /api)",
        local_addr.ip(),
        local_addr.port()
    ));

    axum::serve(listener, router).await?;
    Ok(())
}
