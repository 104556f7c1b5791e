// src/models/driver.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Driver,
    Helper,
    Admin,
    // Único na instalação inteira e imutável depois de criado.
    Superadmin,
}

// --- Motorista ---

// O id é opaco (atribuído pelo armazenamento); o telefone normalizado (só
// dígitos) funciona como chave natural secundária dentro da base.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    #[schema(example = "João da Silva")]
    pub name: String,
    #[schema(example = "21999990000")]
    pub phone: String,
    pub role: Role,
    // Soft-delete: motorista inativo some das listas, o registro fica.
    pub active: bool,
    #[schema(example = "van")]
    pub modality: Option<String>,
}
