// src/models/escala.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Intervalo padrão entre ondas quando o horário é derivado em cascata.
pub const WAVE_STEP_MINUTES: u32 = 20;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Afternoon,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Morning => "morning",
            Period::Afternoon => "afternoon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WaveKind {
    Normal,
    // Ondas dedicadas (cliente exclusivo) são exibidas depois das normais.
    Dedicated,
}

// --- Estrutura da escala ---

// Vaga de um motorista dentro de uma onda. O nome do motorista é um
// snapshot desnormalizado; o job de reconciliação reescreve a partir do
// cadastro quando o motorista muda.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WaveSlot {
    pub driver_id: String,
    #[schema(example = "João da Silva")]
    pub driver_name: String,
    #[schema(example = "03")]
    pub vaga: Option<String>,
    #[schema(example = "A-1")]
    pub rota: Option<String>,
    // Horário herdado da onda no momento da atribuição.
    pub time: Option<String>,
    pub units: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Wave {
    #[schema(example = "Onda 1")]
    pub name: String,
    // HH:MM; pode ficar sem definir (o despachante preenche depois).
    #[schema(example = "08:00")]
    pub time: Option<String>,
    pub kind: WaveKind,
    pub slots: Vec<WaveSlot>,
}

impl Wave {
    pub fn new(name: String, kind: WaveKind) -> Self {
        Self {
            name,
            time: None,
            kind,
            slots: Vec::new(),
        }
    }

    /// Reordena as vagas em ordem crescente de número. Vagas sem número (ou
    /// com número não numérico) vão para o fim, na ordem em que estavam.
    pub fn sort_slots(&mut self) {
        self.slots.sort_by_key(|s| slot_sort_key(&s.vaga));
    }
}

// Turno de meio dia de uma base: a lista ordenada de ondas do dia.
// Criado de forma preguiçosa na primeira inclusão de onda e substituído
// diariamente (turnos antigos são varridos pela manutenção).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shift {
    pub date: NaiveDate,
    pub period: Period,
    pub waves: Vec<Wave>,
}

impl Shift {
    pub fn new(date: NaiveDate, period: Period) -> Self {
        Self {
            date,
            period,
            waves: Vec::new(),
        }
    }

    /// Id do documento no armazenamento: `{data}_{período}`.
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.date.format("%Y-%m-%d"), self.period.as_str())
    }

    /// Onda (índice + nome) em que o motorista aparece, se aparecer.
    pub fn wave_of_driver(&self, driver_id: &str) -> Option<(usize, &Wave)> {
        self.waves
            .iter()
            .enumerate()
            .find(|(_, w)| w.slots.iter().any(|s| s.driver_id == driver_id))
    }
}

/// Chave de ordenação de vaga: numéricas primeiro (em ordem crescente),
/// depois as não numéricas/em branco.
fn slot_sort_key(vaga: &Option<String>) -> (u8, u32) {
    match vaga.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => match v.parse::<u32>() {
            Ok(n) => (0, n),
            Err(_) => (1, 0),
        },
        _ => (1, 0),
    }
}

// --- Horários HH:MM ---

/// Valida e converte "HH:MM" para minutos desde meia-noite.
pub fn parse_hhmm(s: &str) -> Option<u32> {
    let (h, m) = s.split_once(':')?;
    if h.len() != 2 || m.len() != 2 {
        return None;
    }
    let h: u32 = h.parse().ok()?;
    let m: u32 = m.parse().ok()?;
    if h > 23 || m > 59 {
        return None;
    }
    Some(h * 60 + m)
}

pub fn format_hhmm(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
