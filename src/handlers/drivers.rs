// src/handlers/drivers.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::{require_dispatcher, Principal}, tenancy::TenantContext},
    models::driver::{Driver, Role},
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertDriverPayload {
    // Ausente na criação; o servidor atribui um id opaco.
    pub id: Option<String>,
    #[validate(length(min = 1, message = "obrigatório"))]
    #[schema(example = "João da Silva")]
    pub name: String,
    #[schema(example = "(21) 99999-0000")]
    pub phone: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default = "default_active")]
    pub active: bool,
    #[schema(example = "van")]
    pub modality: Option<String>,
}

fn default_role() -> Role {
    Role::Driver
}

fn default_active() -> bool {
    true
}

// POST /api/drivers
//
// Upsert do cadastro. Depois da gravação, o nome desnormalizado nas vagas
// dos turnos de hoje é reconciliado com o cadastro.
#[utoipa::path(
    post,
    path = "/api/drivers",
    tag = "Motoristas",
    request_body = UpsertDriverPayload,
    responses(
        (status = 201, description = "Motorista gravado", body = Driver),
        (status = 409, description = "Telefone já usado por outro motorista ativo")
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn upsert_driver(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(payload): Json<UpsertDriverPayload>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    payload.validate()?;

    let driver = Driver {
        id: payload.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        name: payload.name,
        phone: payload.phone,
        role: payload.role,
        active: payload.active,
        modality: payload.modality,
    };
    app_state.driver_repo.save(&tenant.0, &driver).await?;
    app_state
        .escala_service
        .reconcile_driver_name(&tenant.0, &driver, Utc::now().date_naive())
        .await?;
    Ok((StatusCode::CREATED, Json(driver)))
}

// GET /api/drivers
#[utoipa::path(
    get,
    path = "/api/drivers",
    tag = "Motoristas",
    responses(
        (status = 200, description = "Cadastro completo da base", body = [Driver])
    ),
    params(("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn list_drivers(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    let drivers = app_state.driver_repo.list(&tenant.0).await?;
    Ok(Json(drivers))
}

// GET /api/drivers/{driver_id}
#[utoipa::path(
    get,
    path = "/api/drivers/{driver_id}",
    tag = "Motoristas",
    responses(
        (status = 200, description = "Motorista", body = Driver),
        (status = 404, description = "Motorista não encontrado")
    ),
    params(
        ("driver_id" = String, Path, description = "ID do motorista"),
        ("x-tenant-id" = uuid::Uuid, Header, description = "ID da base")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_driver(
    State(app_state): State<AppState>,
    _principal: Principal,
    tenant: TenantContext,
    Path(driver_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let driver = app_state
        .driver_repo
        .get(&tenant.0, &driver_id)
        .await?
        .ok_or_else(|| AppError::ResourceNotFound("Motorista".to_string()))?;
    Ok(Json(driver))
}
