// src/push.rs

// Contrato do serviço de entrega de push. O provedor concreto fica atrás
// do trait; o núcleo só conhece o formato do payload: destinatário, título,
// corpo e um mapa chave/valor com `type` ∈ {chamada, chamada_estacionamento,
// escala_update, status_update} mais campos da transição (`vaga`, `rota`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::common::error::AppError;

pub const TYPE_CHAMADA: &str = "chamada";
pub const TYPE_CHAMADA_ESTACIONAMENTO: &str = "chamada_estacionamento";
pub const TYPE_ESCALA_UPDATE: &str = "escala_update";
pub const TYPE_STATUS_UPDATE: &str = "status_update";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    // Id do motorista destinatário (o provedor resolve o token do aparelho).
    pub to: String,
    pub title: String,
    pub body: String,
    pub data: Map<String, Value>,
}

impl PushMessage {
    pub fn new(to: &str, title: &str, body: &str, kind: &str) -> Self {
        let mut data = Map::new();
        data.insert("type".to_string(), Value::String(kind.to_string()));
        Self {
            to: to.to_string(),
            title: title.to_string(),
            body: body.to_string(),
            data,
        }
    }

    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.data
            .insert(key.to_string(), Value::String(value.to_string()));
        self
    }
}

#[async_trait]
pub trait PushSender: Send + Sync {
    /// Tentativa imediata de entrega. Falha vira `AppError::Delivery` e o
    /// chamador decide (na prática, a fila de reenvio).
    async fn send(&self, message: &PushMessage) -> Result<(), AppError>;
}

// --- Implementação HTTP ---

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpPushSender {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpPushSender {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl PushSender for HttpPushSender {
    async fn send(&self, message: &PushMessage) -> Result<(), AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(SEND_TIMEOUT)
            .json(message)
            .send()
            .await
            .map_err(|e| AppError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AppError::Delivery(format!(
                "provedor respondeu {}",
                response.status()
            )));
        }
        Ok(())
    }
}
