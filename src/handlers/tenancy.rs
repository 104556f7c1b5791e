// src/handlers/tenancy.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::{auth::{require_dispatcher, require_superadmin, Principal}, tenancy::TenantContext},
    models::geofence::YardZones,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTenantPayload {
    #[validate(length(min = 1, message = "obrigatório"))]
    #[schema(example = "Base Zona Oeste")]
    pub name: String,
    pub theme: Option<serde_json::Value>,
}

// POST /api/tenants
//
// Registro público: a base nasce pendente e só opera depois da aprovação.
#[utoipa::path(
    post,
    path = "/api/tenants",
    tag = "Bases",
    request_body = RegisterTenantPayload,
    responses(
        (status = 201, description = "Base registrada como pendente", body = crate::models::tenancy::Tenant)
    )
)]
pub async fn register_tenant(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterTenantPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let tenant = app_state
        .tenancy_service
        .register(payload.name, payload.theme)
        .await?;
    Ok((StatusCode::CREATED, Json(tenant)))
}

// GET /api/tenants
#[utoipa::path(
    get,
    path = "/api/tenants",
    tag = "Bases",
    responses(
        (status = 200, description = "Todas as bases, em qualquer estado de aprovação", body = [crate::models::tenancy::Tenant])
    ),
    security(("api_jwt" = []))
)]
pub async fn list_tenants(
    State(app_state): State<AppState>,
    principal: Principal,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&principal)?;
    let tenants = app_state.tenancy_service.list().await?;
    Ok(Json(tenants))
}

// POST /api/tenants/{id}/approve
#[utoipa::path(
    post,
    path = "/api/tenants/{id}/approve",
    tag = "Bases",
    responses(
        (status = 200, description = "Base aprovada", body = crate::models::tenancy::Tenant),
        (status = 404, description = "Base não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn approve_tenant(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&principal)?;
    let tenant = app_state.tenancy_service.approve(&id).await?;
    Ok(Json(tenant))
}

// POST /api/tenants/{id}/reject
#[utoipa::path(
    post,
    path = "/api/tenants/{id}/reject",
    tag = "Bases",
    responses(
        (status = 204, description = "Base rejeitada e removida em cascata"),
        (status = 404, description = "Base não encontrada")
    ),
    params(("id" = Uuid, Path, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn reject_tenant(
    State(app_state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_superadmin(&principal)?;
    app_state.tenancy_service.reject(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Zonas de geofence da base ---

// GET /api/tenants/zones
#[utoipa::path(
    get,
    path = "/api/tenants/zones",
    tag = "Bases",
    responses(
        (status = 200, description = "Zonas de pátio e estacionamento", body = YardZones)
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn get_zones(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    let zones = app_state.tenancy_service.get_zones(&tenant.0).await?;
    Ok(Json(zones))
}

// PUT /api/tenants/zones
#[utoipa::path(
    put,
    path = "/api/tenants/zones",
    tag = "Bases",
    request_body = YardZones,
    responses(
        (status = 204, description = "Zonas gravadas; zona zerada fica desativada")
    ),
    params(("x-tenant-id" = Uuid, Header, description = "ID da base")),
    security(("api_jwt" = []))
)]
pub async fn set_zones(
    State(app_state): State<AppState>,
    principal: Principal,
    tenant: TenantContext,
    Json(zones): Json<YardZones>,
) -> Result<impl IntoResponse, AppError> {
    require_dispatcher(&principal)?;
    app_state.tenancy_service.set_zones(&tenant.0, &zones).await?;
    Ok(StatusCode::NO_CONTENT)
}
