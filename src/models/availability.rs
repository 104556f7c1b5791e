// src/models/availability.rs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::common::identity::normalize_phone;

// Entrada de um motorista na lista de disponibilidade do dia.
// `available` fica em None enquanto o motorista não responde.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PollEntry {
    pub driver_id: String,
    pub name: String,
    pub phone: String,
    pub available: Option<bool>,
    pub responded_at: Option<DateTime<Utc>>,
}

impl PollEntry {
    /// Chave de agrupamento da deduplicação: telefone normalizado; sem
    /// telefone, o id cru serve de chave (cada entrada fica sozinha).
    pub fn dedup_key(&self) -> String {
        let phone = normalize_phone(&self.phone);
        if phone.is_empty() {
            self.driver_id.clone()
        } else {
            phone
        }
    }
}

// Uma lista por (base, data). Criada automaticamente para o dia seguinte;
// o invariante (no máximo uma entrada por telefone normalizado) é
// restabelecido pela deduplicação depois de cada mutação.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityPoll {
    pub date: NaiveDate,
    pub entries: Vec<PollEntry>,
}

impl AvailabilityPoll {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            entries: Vec::new(),
        }
    }
}
