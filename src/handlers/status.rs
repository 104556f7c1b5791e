// src/handlers/status.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::Principal, tenancy::TenantContext},
};

// Rotas do aplicativo do motorista: o sujeito é sempre o dono do token.

// GET /api/status/me
#[utoipa::path(
    get,
    path = "/api/status/me",
    tag = "Status",
    responses(
        (status = 200, description = "Registro operacional do motorista", body = crate::models::status::StatusRecord),
        (status = 404, description = "Motorista sem registro de status")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn get_my_status(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let record = app_state
        .status_repo
        .get(&tenant.0, &principal.id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound("Status do motorista".to_string()))?;
    Ok(Json(record))
}

// POST /api/status/me/ack
#[utoipa::path(
    post,
    path = "/api/status/me/ack",
    tag = "Status",
    responses(
        (status = 204, description = "Leitura confirmada; não conta como transição")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn acknowledge(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    app_state
        .status_repo
        .ack(&tenant.0, &principal.id, Utc::now())
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationPayload {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude fora do intervalo"))]
    #[schema(example = -22.9068)]
    pub lat: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude fora do intervalo"))]
    #[schema(example = -43.1729)]
    pub lon: f64,
}

// POST /api/status/me/location
#[utoipa::path(
    post,
    path = "/api/status/me/location",
    tag = "Status",
    request_body = LocationPayload,
    responses(
        (status = 204, description = "Posição registrada para o avaliador de geofence")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn report_location(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(payload): Json<LocationPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    app_state
        .status_repo
        .set_location(
            &tenant.0,
            &principal.id,
            &crate::models::geofence::GeoPoint {
                lat: payload.lat,
                lon: payload.lon,
            },
        )
        .await?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

// POST /api/status/me/complete
//
// O motorista também pode concluir o próprio carregamento pelo app; a
// regra é a mesma da conclusão pelo despachante.
#[utoipa::path(
    post,
    path = "/api/status/me/complete",
    tag = "Status",
    responses(
        (status = 200, description = "Carregamento concluído", body = crate::models::status::StatusRecord),
        (status = 409, description = "Motorista não está carregando")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn complete_my_loading(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    let record = app_state
        .dispatch_service
        .mark_complete(&tenant.0, &principal.id, Utc::now().date_naive())
        .await?;
    Ok(Json(record))
}

// GET /api/status/{driver_id}/quinzena/{month}/{year}
#[utoipa::path(
    get,
    path = "/api/status/{driver_id}/quinzena/{month}/{year}",
    tag = "Status",
    responses(
        (status = 200, description = "Quinzena do motorista no mês (listas e contagens)", body = crate::models::quinzena::Quinzena)
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("month" = u32, Path, description = "Mês (1-12)"),
        ("year" = i32, Path, description = "Ano"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_quinzena(
    State(app_state): State<AppState>,
    _principal: Principal,
    tenant: TenantContext,
    Path((driver_id, month, year)): Path<(String, u32, i32)>,
) -> Result<impl IntoResponse, AppError> {
    let quinzena = app_state
        .quinzena_service
        .get(&tenant.0, &driver_id, month, year)
        .await?;
    Ok(Json(quinzena))
}
