// src/models/tenancy.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TenantApproval {
    Pending,
    Active,
    Rejected,
}

// A base é a fronteira de isolamento: todo o resto vive aninhado nela.
// Criada pendente no registro; a rejeição apaga a base e todas as coleções
// filhas em cascata.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    #[schema(example = "Base Zona Oeste")]
    pub name: String,
    pub approval: TenantApproval,
    // Metadados de tema (cores, logo), passados adiante sem interpretação.
    pub theme: Option<serde_json::Value>,
}
