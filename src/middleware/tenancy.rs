// src/middleware/tenancy.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::common::error::AppError;

// Cabeçalho que identifica a base em toda rota aninhada nela.
const TENANT_ID_HEADER: &str = "x-tenant-id";

// A base alvo da requisição. Todo caminho de documento do armazenamento
// nasce deste UUID; sem ele não há isolamento.
#[derive(Debug, Clone, Copy)]
pub struct TenantContext(pub Uuid);

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(TENANT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                AppError::BadHeader("x-tenant-id é obrigatório".to_string())
            })?;
        let id = Uuid::parse_str(value)
            .map_err(|_| AppError::BadHeader("x-tenant-id não é um UUID".to_string()))?;
        Ok(TenantContext(id))
    }
}
