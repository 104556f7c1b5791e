// src/db/remote.rs

// Contrato do armazenamento remoto de documentos. O substrato concreto
// (Firestore, RTDB, etc.) fica fora deste repositório; os serviços enxergam
// só este trait. Documentos são endereçados por caminhos com barra
// (`tenants/{t}/status/{d}`) e gravados por upsert de documento inteiro:
// o último escritor vence, sem merge no cliente.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::common::error::AppError;

pub type Document = Value;

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Document>, AppError>;

    /// Upsert de documento inteiro (último escritor vence).
    async fn set(&self, path: &str, doc: Document) -> Result<(), AppError>;

    /// Atualização de campos avulsos, sem tocar no resto do documento.
    async fn merge(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError>;

    async fn delete(&self, path: &str) -> Result<(), AppError>;

    /// Todos os documentos cujo caminho começa com `prefix`.
    async fn list(&self, prefix: &str) -> Result<Vec<(String, Document)>, AppError>;

    /// Assinatura de mudanças de um documento. O consumo em tempo real é
    /// dos clientes (app do motorista, painel do despachante), que assinam
    /// pelo adaptador concreto do substrato; o servidor em si não mantém
    /// assinaturas abertas, só garante o contrato nos testes dos
    /// repositórios.
    async fn subscribe(&self, path: &str) -> Result<Subscription, AppError>;
}

// Assinatura de um documento: um canal de consumidor único + cancelamento
// no drop. Handlers da mesma assinatura nunca rodam em paralelo; handlers
// de assinaturas diferentes podem se intercalar e não devem assumir ordem
// entre si.
//
// ATENÇÃO: o primeiro valor entregue depois de (re)assinar é o snapshot
// autoritativo do documento. Ele NÃO deve ser comparado com estado local
// anterior à assinatura: trate-o como verdade inicial, não como mudança.
pub struct Subscription {
    rx: mpsc::Receiver<Document>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub fn new(rx: mpsc::Receiver<Document>, token: CancellationToken) -> Self {
        Self {
            rx,
            _guard: SubscriptionGuard(token),
        }
    }

    /// Próximo valor do documento; None quando a assinatura termina.
    pub async fn next(&mut self) -> Option<Document> {
        self.rx.recv().await
    }
}

// Cancela a assinatura quando o dono (tela/sessão) solta a inscrição.
// Sem isso, a próxima sessão receberia updates e notificações duplicadas.
struct SubscriptionGuard(CancellationToken);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

// --- Retry com backoff ---

const MAX_WRITE_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: u64 = 200;

/// Executa `f` com até três tentativas, dormindo com backoff exponencial e
/// jitter entre elas. Só falhas transitórias do armazenamento são
/// retentadas; os demais erros sobem direto.
pub async fn with_retry<T, F, Fut>(op: &str, f: F) -> Result<T, AppError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Ok(value) => return Ok(value),
            Err(AppError::TransientStore(msg)) if attempt < MAX_WRITE_ATTEMPTS => {
                let backoff = BASE_BACKOFF_MS * 2u64.pow(attempt - 1);
                let jitter = (rand::random::<f64>() * 100.0) as u64;
                tracing::warn!(
                    "Falha transitória em {} (tentativa {}/{}): {}. Retry em {}ms",
                    op,
                    attempt,
                    MAX_WRITE_ATTEMPTS,
                    msg,
                    backoff + jitter
                );
                tokio::time::sleep(Duration::from_millis(backoff + jitter)).await;
            }
            Err(e) => return Err(e),
        }
    }
}

// --- Caminhos dos documentos ---

pub mod paths {
    use chrono::NaiveDate;
    use uuid::Uuid;

    pub fn tenant(t: &Uuid) -> String {
        format!("tenants/{t}")
    }

    /// Prefixo de todas as coleções filhas da base (para o cascade delete).
    pub fn tenant_children(t: &Uuid) -> String {
        format!("tenants/{t}/")
    }

    pub fn driver(t: &Uuid, d: &str) -> String {
        format!("tenants/{t}/drivers/{d}")
    }

    pub fn drivers_prefix(t: &Uuid) -> String {
        format!("tenants/{t}/drivers/")
    }

    pub fn status(t: &Uuid, d: &str) -> String {
        format!("tenants/{t}/status/{d}")
    }

    pub fn status_prefix(t: &Uuid) -> String {
        format!("tenants/{t}/status/")
    }

    pub fn shift(t: &Uuid, doc_id: &str) -> String {
        format!("tenants/{t}/shifts/{doc_id}")
    }

    pub fn shifts_prefix(t: &Uuid) -> String {
        format!("tenants/{t}/shifts/")
    }

    pub fn zones(t: &Uuid) -> String {
        format!("tenants/{t}/config/zones")
    }

    pub fn location(t: &Uuid, d: &str) -> String {
        format!("tenants/{t}/locations/{d}")
    }

    pub fn availability(t: &Uuid, date: NaiveDate) -> String {
        format!("availability/{t}_{}", date.format("%Y-%m-%d"))
    }

    pub fn availability_prefix(t: &Uuid) -> String {
        format!("availability/{t}_")
    }

    pub fn quinzena(t: &Uuid, d: &str, month: u32, year: i32) -> String {
        format!("worked_day_ledger/{t}_{d}_{month}_{year}")
    }

    pub fn quinzena_prefix(t: &Uuid) -> String {
        format!("worked_day_ledger/{t}_")
    }

    pub fn push_queue(id: &Uuid) -> String {
        format!("push_queue/{id}")
    }

    pub fn push_queue_prefix() -> String {
        "push_queue/".to_string()
    }
}
