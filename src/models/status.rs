// src/models/status.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// Mensagens fixas que aparecem no app do motorista.
pub const MSG_ESCALADO: &str = "escalado";
pub const MSG_CHAMADA_CARREGAMENTO: &str = "chamada para carregamento";
pub const MSG_CHAMADA_ESTACIONAMENTO: &str = "chamada para estacionamento";
pub const MSG_CARREGAMENTO_CONCLUIDO: &str = "carregamento concluído";

// --- Ciclo de vida operacional ---

// EN_ROUTE é o estado inicial e também o estado pós-reset. Um motorista que
// não está em nenhuma onda do turno corrente é "não escalado", o que é
// diferente de qualquer variante daqui (o registro existe mas a UI não
// expõe semântica de status para ele).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriverState {
    EnRoute,
    Arrived,
    ToParking,
    Parked,
    Loading,
    Done,
}

impl DriverState {
    /// Terminal até o despachante resetar.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DriverState::Done)
    }

    /// Estados em que já houve uma ação de pátio em andamento. Usado para
    /// decidir se uma observação de DONE merece notificação: DONE sem um
    /// estado anterior em andamento não notifica.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            DriverState::ToParking | DriverState::Parked | DriverState::Loading
        )
    }
}

// --- Registro de status ---

// Um documento por (base, motorista). Nunca é apagado: reset e remoção de
// onda reescrevem o documento inteiro para a forma inicial.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusRecord {
    pub state: DriverState,
    #[schema(example = "chamada para carregamento")]
    pub message: String,
    #[schema(example = "03")]
    pub vaga: Option<String>,
    #[schema(example = "A-1")]
    pub rota: Option<String>,
    pub loading_started_at: Option<DateTime<Utc>>,
    pub loading_ended_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl StatusRecord {
    /// Forma inicial ao entrar numa onda: EN_ROUTE com mensagem "escalado",
    /// vaga/rota e carimbos de carregamento limpos.
    pub fn scheduled() -> Self {
        Self {
            state: DriverState::EnRoute,
            message: MSG_ESCALADO.to_string(),
            vaga: None,
            rota: None,
            loading_started_at: None,
            loading_ended_at: None,
            acknowledged_at: None,
            updated_at: Utc::now(),
        }
    }

    /// Forma limpa ao sair de todas as ondas: EN_ROUTE com mensagem vazia.
    /// A mensagem vazia é interpretada pelo dispatcher de notificações como
    /// remoção administrativa (não notifica).
    pub fn cleared() -> Self {
        Self {
            message: String::new(),
            ..Self::scheduled()
        }
    }
}

/// Regra de idempotência do ciclo: só houve transição de verdade se
/// `state`, `message`, `vaga` ou `rota` mudaram em relação ao registro
/// anterior observado. Escritas que só mexem no acknowledgedAt (ou em
/// carimbos derivados) não contam.
pub fn transition_occurred(prev: &StatusRecord, next: &StatusRecord) -> bool {
    prev.state != next.state
        || prev.message != next.message
        || prev.vaga != next.vaga
        || prev.rota != next.rota
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_nao_conta_como_transicao() {
        let prev = StatusRecord::scheduled();
        let mut next = prev.clone();
        next.acknowledged_at = Some(Utc::now());
        next.updated_at = Utc::now();
        assert!(!transition_occurred(&prev, &next));
    }

    #[test]
    fn mudanca_de_vaga_conta_como_transicao() {
        let prev = StatusRecord::scheduled();
        let mut next = prev.clone();
        next.vaga = Some("07".to_string());
        assert!(transition_occurred(&prev, &next));
    }

    #[test]
    fn estados_em_andamento() {
        assert!(DriverState::Loading.is_in_progress());
        assert!(DriverState::ToParking.is_in_progress());
        assert!(!DriverState::EnRoute.is_in_progress());
        assert!(!DriverState::Done.is_in_progress());
        assert!(DriverState::Done.is_terminal());
    }
}
