// src/services/notification_service.rs

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::remote::{paths, RemoteStore},
    models::status::{DriverState, StatusRecord, transition_occurred},
    push::{
        PushMessage, PushSender, TYPE_CHAMADA, TYPE_CHAMADA_ESTACIONAMENTO, TYPE_ESCALA_UPDATE,
        TYPE_STATUS_UPDATE,
    },
};

const MAX_DELIVERY_ATTEMPTS: u32 = 5;
// Backoff LINEAR da fila de reenvio: tentativa n espera n * este passo.
const RETRY_STEP: chrono::Duration = chrono::Duration::seconds(60);
const WORKER_PERIOD: Duration = Duration::from_secs(30);

// Item durável da fila de reenvio. Sobrevive a reinício do processo: a
// fila mora no armazenamento, não na memória do request que a criou.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueuedPush {
    id: Uuid,
    message: PushMessage,
    attempts: u32,
    next_attempt_at: DateTime<Utc>,
}

// Traduz transições confirmadas de status em push para o motorista, com a
// regra de supressão (transition_occurred) aplicada ANTES de qualquer
// envio. A entrega é fire-and-forget para quem chamou: a mutação de status
// já está durável quando chegamos aqui, e falha de envio nunca sobe.
pub struct NotificationService {
    push: Arc<dyn PushSender>,
    store: Arc<dyn RemoteStore>,
}

impl NotificationService {
    pub fn new(push: Arc<dyn PushSender>, store: Arc<dyn RemoteStore>) -> Self {
        Self { push, store }
    }

    /// Avalia uma escrita de status e dispara (ou suprime) a notificação.
    /// `prev` é o registro observado antes da escrita; None significa que é
    /// a primeira observação deste motorista.
    pub async fn notify_transition(
        &self,
        driver_id: &str,
        prev: Option<&StatusRecord>,
        next: &StatusRecord,
    ) {
        if let Some(prev) = prev {
            // Escrita que só mexeu no acknowledgedAt não é transição.
            if !transition_occurred(prev, next) {
                tracing::debug!("Status de {} sem transição real, push suprimido", driver_id);
                return;
            }
        }

        // Mensagem vazia = remoção administrativa, não é evento de usuário.
        if next.message.is_empty() {
            return;
        }

        let message = match next.state {
            DriverState::Loading => {
                let vaga = next.vaga.as_deref().unwrap_or("-");
                let rota = next.rota.as_deref().unwrap_or("-");
                Some(
                    PushMessage::new(
                        driver_id,
                        "Chamada para carregamento",
                        &format!("Dirija-se à vaga {vaga} (rota {rota})."),
                        TYPE_CHAMADA,
                    )
                    .with_field("vaga", vaga)
                    .with_field("rota", rota),
                )
            }
            DriverState::ToParking => Some(PushMessage::new(
                driver_id,
                "Chamada para estacionamento",
                "Dirija-se ao estacionamento e aguarde.",
                TYPE_CHAMADA_ESTACIONAMENTO,
            )),
            DriverState::Done => {
                // Uma primeira observação de DONE (sem estado em andamento
                // antes) não notifica.
                let preceded = prev.map(|p| p.state.is_in_progress()).unwrap_or(false);
                preceded.then(|| {
                    PushMessage::new(
                        driver_id,
                        "Carregamento concluído",
                        "Bom trabalho! Carregamento finalizado.",
                        TYPE_STATUS_UPDATE,
                    )
                })
            }
            // Chegada/estacionado por geofence e reset não geram push.
            _ => None,
        };

        if let Some(message) = message {
            self.deliver(message).await;
        }
    }

    /// Broadcast "você foi escalado" para um lote de motoristas recém
    /// incluídos na escala.
    pub async fn notify_scheduled_bulk(&self, driver_ids: &[String]) {
        for driver_id in driver_ids {
            let message = PushMessage::new(
                driver_id,
                "Escala atualizada",
                "Você foi escalado. Confira sua onda e horário.",
                TYPE_ESCALA_UPDATE,
            );
            self.deliver(message).await;
        }
    }

    /// Entrega imediata; se falhar, o item vai para a fila durável e o
    /// worker de reenvio assume. Nunca devolve erro.
    async fn deliver(&self, message: PushMessage) {
        match self.push.send(&message).await {
            Ok(()) => {
                tracing::debug!("Push entregue para {}", message.to);
            }
            Err(e) => {
                tracing::warn!("Push para {} falhou ({}); indo para a fila", message.to, e);
                if let Err(e) = self.enqueue(message).await {
                    tracing::error!("Falha ao enfileirar push: {}", e);
                }
            }
        }
    }

    async fn enqueue(&self, message: PushMessage) -> Result<(), AppError> {
        let item = QueuedPush {
            id: Uuid::new_v4(),
            message,
            attempts: 1,
            next_attempt_at: Utc::now() + RETRY_STEP,
        };
        self.store
            .set(&paths::push_queue(&item.id), serde_json::to_value(&item)?)
            .await
    }

    /// Uma passada da fila de reenvio: tenta os itens vencidos; sucesso
    /// remove, falha reagenda com backoff linear até o limite de
    /// tentativas.
    pub async fn drain_queue_once(&self) -> Result<(), AppError> {
        let now = Utc::now();
        for (path, doc) in self.store.list(&paths::push_queue_prefix()).await? {
            let mut item: QueuedPush = match serde_json::from_value(doc) {
                Ok(item) => item,
                Err(e) => {
                    tracing::error!("Item de fila malformado em {} ({}), removendo", path, e);
                    self.store.delete(&path).await?;
                    continue;
                }
            };
            if item.next_attempt_at > now {
                continue;
            }

            match self.push.send(&item.message).await {
                Ok(()) => {
                    tracing::info!(
                        "Push reenviado para {} na tentativa {}",
                        item.message.to,
                        item.attempts + 1
                    );
                    self.store.delete(&path).await?;
                }
                Err(e) if item.attempts + 1 >= MAX_DELIVERY_ATTEMPTS => {
                    tracing::error!(
                        "Push para {} descartado depois de {} tentativas: {}",
                        item.message.to,
                        MAX_DELIVERY_ATTEMPTS,
                        e
                    );
                    self.store.delete(&path).await?;
                }
                Err(e) => {
                    item.attempts += 1;
                    item.next_attempt_at = now + RETRY_STEP * (item.attempts as i32);
                    tracing::warn!(
                        "Push para {} falhou de novo ({}); próxima tentativa {}",
                        item.message.to,
                        e,
                        item.next_attempt_at
                    );
                    self.store
                        .set(&path, serde_json::to_value(&item)?)
                        .await?;
                }
            }
        }
        Ok(())
    }

    /// Worker de reenvio: roda desacoplado do request que enfileirou, até o
    /// token cancelar. Uma passada com erro não derruba o worker.
    pub async fn run_retry_worker(self: Arc<Self>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(WORKER_PERIOD);
        tracing::info!("Worker de reenvio de push iniciado");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Worker de reenvio de push encerrando");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.drain_queue_once().await {
                        tracing::error!("Passada da fila de reenvio falhou: {}", e);
                    }
                }
            }
        }
    }
}
