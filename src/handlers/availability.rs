// src/handlers/availability.rs

use axum::{
    extract::{Query, State},
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
    middleware::{auth::Principal, tenancy::TenantContext},
};

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct PollQuery {
    #[param(example = "2026-08-30")]
    pub date: NaiveDate,
}

// GET /api/availability
//
// Cria a lista do dia a partir do cadastro ativo se ainda não existir;
// listas pré-existentes voltam já deduplicadas.
#[utoipa::path(
    get,
    path = "/api/availability",
    tag = "Disponibilidade",
    responses(
        (status = 200, description = "Lista de disponibilidade do dia", body = crate::models::availability::AvailabilityPoll)
    ),
    params(
        PollQuery,
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_poll(
    State(app_state): State<AppState>,
    _principal: Principal,
    tenant: TenantContext,
    Query(query): Query<PollQuery>,
) -> Result<impl IntoResponse, AppError> {
    let poll = app_state
        .availability_service
        .ensure_poll(&tenant.0, query.date)
        .await?;
    Ok(Json(poll))
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RespondPayload {
    pub date: NaiveDate,
    pub available: bool,
}

// POST /api/availability/respond
#[utoipa::path(
    post,
    path = "/api/availability/respond",
    tag = "Disponibilidade",
    request_body = RespondPayload,
    responses(
        (status = 200, description = "Resposta registrada", body = crate::models::availability::AvailabilityPoll),
        (status = 404, description = "Motorista não está na lista do dia")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn respond(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(payload): Json<RespondPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let poll = app_state
        .availability_service
        .record_response(&tenant.0, payload.date, &principal.id, payload.available)
        .await?;
    Ok(Json(poll))
}
