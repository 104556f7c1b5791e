// src/handlers/escala.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::{require_dispatcher, Principal}, tenancy::TenantContext},
    models::escala::{Period, WaveKind},
};

// Par (data, período) que identifica o turno em todas as rotas de escala.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ShiftQuery {
    #[param(example = "2026-08-29")]
    pub date: NaiveDate,
    pub period: Period,
}

// =============================================================================
//  Ondas
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddWavePayload {
    pub date: NaiveDate,
    pub period: Period,
    #[schema(example = "Onda 1")]
    pub name: Option<String>,
    #[serde(default = "default_wave_kind")]
    pub kind: WaveKind,
}

fn default_wave_kind() -> WaveKind {
    WaveKind::Normal
}

// POST /api/escala/waves
#[utoipa::path(
    post,
    path = "/api/escala/waves",
    tag = "Escala",
    request_body = AddWavePayload,
    responses(
        (status = 201, description = "Onda acrescentada ao turno", body = crate::models::escala::Shift)
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn add_wave(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(payload): Json<AddWavePayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let shift = app_state
        .escala_service
        .add_wave(
            &tenant.0,
            payload.date,
            payload.period,
            payload.name,
            payload.kind,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetWaveTimePayload {
    pub date: NaiveDate,
    pub period: Period,
    #[validate(length(min = 1, message = "obrigatório"))]
    #[schema(example = "08:00")]
    pub time: String,
}

// PUT /api/escala/waves/{wave_index}/time
#[utoipa::path(
    put,
    path = "/api/escala/waves/{wave_index}/time",
    tag = "Escala",
    request_body = SetWaveTimePayload,
    responses(
        (status = 200, description = "Horário definido; ondas seguintes recalculadas em cascata", body = crate::models::escala::Shift),
        (status = 400, description = "Horário fora do padrão HH:MM")
    ),
    params(
        ("wave_index" = usize, Path, description = "Índice da onda no turno"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn set_wave_time(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(wave_index): Path<usize>,
    Json(payload): Json<SetWaveTimePayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let shift = app_state
        .escala_service
        .set_wave_time(
            &tenant.0,
            payload.date,
            payload.period,
            wave_index,
            &payload.time,
        )
        .await?;
    Ok(Json(shift))
}

// =============================================================================
//  Vagas
// =============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignDriverPayload {
    pub date: NaiveDate,
    pub period: Period,
    #[validate(length(min = 1, message = "obrigatório"))]
    pub driver_id: String,
    #[schema(example = "03")]
    pub vaga: Option<String>,
    #[schema(example = "A-1")]
    pub rota: Option<String>,
    pub units: Option<u32>,
}

// POST /api/escala/waves/{wave_index}/slots
#[utoipa::path(
    post,
    path = "/api/escala/waves/{wave_index}/slots",
    tag = "Escala",
    request_body = AssignDriverPayload,
    responses(
        (status = 201, description = "Motorista escalado; status reiniciado para \"escalado\"", body = crate::models::escala::Shift),
        (status = 409, description = "Motorista já em outra onda, ou vaga ocupada")
    ),
    params(
        ("wave_index" = usize, Path, description = "Índice da onda no turno"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn assign_driver(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(wave_index): Path<usize>,
    Json(payload): Json<AssignDriverPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let shift = app_state
        .escala_service
        .assign_driver(
            &tenant.0,
            payload.date,
            payload.period,
            wave_index,
            &payload.driver_id,
            payload.vaga,
            payload.rota,
            payload.units,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSlotPayload {
    pub date: NaiveDate,
    pub period: Period,
    pub vaga: Option<String>,
    pub rota: Option<String>,
    pub units: Option<u32>,
}

// PATCH /api/escala/waves/{wave_index}/slots/{driver_id}
#[utoipa::path(
    patch,
    path = "/api/escala/waves/{wave_index}/slots/{driver_id}",
    tag = "Escala",
    request_body = UpdateSlotPayload,
    responses(
        (status = 200, description = "Vaga atualizada", body = crate::models::escala::Shift)
    ),
    params(
        ("wave_index" = usize, Path, description = "Índice da onda no turno"),
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_slot(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path((wave_index, driver_id)): Path<(usize, String)>,
    Json(payload): Json<UpdateSlotPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let shift = app_state
        .escala_service
        .update_slot(
            &tenant.0,
            payload.date,
            payload.period,
            wave_index,
            &driver_id,
            payload.vaga,
            payload.rota,
            payload.units,
        )
        .await?;
    Ok(Json(shift))
}

// DELETE /api/escala/waves/{wave_index}/slots/{driver_id}
#[utoipa::path(
    delete,
    path = "/api/escala/waves/{wave_index}/slots/{driver_id}",
    tag = "Escala",
    responses(
        (status = 200, description = "Motorista removido da onda; status limpo se saiu de todas", body = crate::models::escala::Shift)
    ),
    params(
        ShiftQuery,
        ("wave_index" = usize, Path, description = "Índice da onda no turno"),
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn remove_driver(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path((wave_index, driver_id)): Path<(usize, String)>,
    Query(query): Query<ShiftQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;

    let shift = app_state
        .escala_service
        .remove_driver(&tenant.0, query.date, query.period, wave_index, &driver_id)
        .await?;
    Ok(Json(shift))
}

// =============================================================================
//  Leitura
// =============================================================================

// GET /api/escala/display
#[utoipa::path(
    get,
    path = "/api/escala/display",
    tag = "Escala",
    responses(
        (status = 200, description = "Ondas na ordem de exibição (normais, depois dedicadas)", body = [crate::models::escala::Wave])
    ),
    params(
        ShiftQuery,
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_display(
    State(app_state): State<AppState>,
    _principal: Principal,
    tenant: TenantContext,
    Query(query): Query<ShiftQuery>,
) -> Result<impl IntoResponse, AppError> {
    let waves = app_state
        .escala_service
        .list_waves_for_display(&tenant.0, query.date, query.period)
        .await?;
    Ok(Json(waves))
}

// GET /api/escala
#[utoipa::path(
    get,
    path = "/api/escala",
    tag = "Escala",
    responses(
        (status = 200, description = "Turno cru, na ordem de criação (null se não existir)", body = crate::models::escala::Shift)
    ),
    params(
        ShiftQuery,
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_shift(
    State(app_state): State<AppState>,
    _principal: Principal,
    tenant: TenantContext,
    Query(query): Query<ShiftQuery>,
) -> Result<impl IntoResponse, AppError> {
    let shift = app_state
        .escala_service
        .get_shift(&tenant.0, query.date, query.period)
        .await?;
    Ok(Json(shift))
}
