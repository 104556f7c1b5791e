// src/handlers/operations.rs

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::{require_dispatcher, Principal}, tenancy::TenantContext},
    models::escala::Period,
};

// Ações do despachante sobre o ciclo do motorista. Todas são idempotentes
// no push: repetir a mesma ação grava um registro idêntico e o dispatcher
// de notificações suprime o reenvio.

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallToSlotPayload {
    #[validate(length(min = 1, message = "obrigatório"))]
    #[schema(example = "03")]
    pub vaga: String,
    #[schema(example = "A-1")]
    pub rota: Option<String>,
}

// POST /api/operations/{driver_id}/call
#[utoipa::path(
    post,
    path = "/api/operations/{driver_id}/call",
    tag = "Operações",
    request_body = CallToSlotPayload,
    responses(
        (status = 200, description = "Motorista chamado para a vaga", body = crate::models::status::StatusRecord),
        (status = 409, description = "Motorista em estado terminal")
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn call_to_slot(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(driver_id): Path<String>,
    Json(payload): Json<CallToSlotPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let record = app_state
        .dispatch_service
        .call_to_slot(&tenant.0, &driver_id, &payload.vaga, payload.rota.as_deref())
        .await?;
    Ok(Json(record))
}

// POST /api/operations/{driver_id}/call-to-parking
#[utoipa::path(
    post,
    path = "/api/operations/{driver_id}/call-to-parking",
    tag = "Operações",
    responses(
        (status = 200, description = "Motorista chamado para o estacionamento", body = crate::models::status::StatusRecord)
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn call_to_parking(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;

    let record = app_state
        .dispatch_service
        .call_to_parking(&tenant.0, &driver_id)
        .await?;
    Ok(Json(record))
}

// POST /api/operations/{driver_id}/complete
#[utoipa::path(
    post,
    path = "/api/operations/{driver_id}/complete",
    tag = "Operações",
    responses(
        (status = 200, description = "Carregamento concluído; dia creditado na quinzena", body = crate::models::status::StatusRecord),
        (status = 409, description = "Motorista não está carregando")
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_complete(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;

    let record = app_state
        .dispatch_service
        .mark_complete(&tenant.0, &driver_id, Utc::now().date_naive())
        .await?;
    Ok(Json(record))
}

// POST /api/operations/{driver_id}/reset
#[utoipa::path(
    post,
    path = "/api/operations/{driver_id}/reset",
    tag = "Operações",
    responses(
        (status = 200, description = "Status reiniciado para \"escalado\"", body = crate::models::status::StatusRecord)
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn reset_status(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;

    let record = app_state
        .dispatch_service
        .reset_status(&tenant.0, &driver_id)
        .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotifyScheduledPayload {
    pub date: NaiveDate,
    pub period: Period,
}

// POST /api/operations/notify-scheduled
#[utoipa::path(
    post,
    path = "/api/operations/notify-scheduled",
    tag = "Operações",
    request_body = NotifyScheduledPayload,
    responses(
        (status = 200, description = "Aviso de escala enviado a todos os motoristas do turno")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn notify_scheduled(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(payload): Json<NotifyScheduledPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let count = app_state
        .dispatch_service
        .notify_all_scheduled(&tenant.0, payload.date, payload.period)
        .await?;
    Ok(Json(serde_json::json!({ "notified": count })))
}
