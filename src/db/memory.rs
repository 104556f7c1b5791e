// src/db/memory.rs

// Implementação em memória do RemoteStore. Serve de substrato padrão do
// binário (o substrato real é um colaborador externo) e de dublê nos
// testes. Reproduz o comportamento relevante do contrato: upsert de
// documento inteiro, merge de campos e assinaturas que entregam o snapshot
// corrente como primeiro valor.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::common::error::AppError;
use crate::db::remote::{Document, RemoteStore, Subscription};

const CHANNEL_CAPACITY: usize = 32;

struct Watcher {
    tx: mpsc::Sender<Document>,
    token: CancellationToken,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    docs: Arc<RwLock<HashMap<String, Document>>>,
    watchers: Arc<Mutex<HashMap<String, Vec<Watcher>>>>,
    // Contador de falhas injetadas: enquanto > 0, escritas falham com
    // TransientStore. Usado pelos testes de rollback/retry.
    fail_writes: Arc<AtomicU32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn inject_write_failures(&self, count: u32) {
        self.fail_writes.store(count, Ordering::SeqCst);
    }

    fn consume_injected_failure(&self) -> Result<(), AppError> {
        let remaining = self.fail_writes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_writes.store(remaining - 1, Ordering::SeqCst);
            return Err(AppError::TransientStore("falha injetada".to_string()));
        }
        Ok(())
    }

    async fn notify(&self, path: &str, doc: &Document) {
        let mut watchers = self.watchers.lock().await;
        if let Some(list) = watchers.get_mut(path) {
            list.retain(|w| !w.token.is_cancelled() && !w.tx.is_closed());
            for watcher in list.iter() {
                // try_send: um assinante lento não pode travar o escritor.
                let _ = watcher.tx.try_send(doc.clone());
            }
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Document>, AppError> {
        Ok(self.docs.read().await.get(path).cloned())
    }

    async fn set(&self, path: &str, doc: Document) -> Result<(), AppError> {
        self.consume_injected_failure()?;
        self.docs
            .write()
            .await
            .insert(path.to_string(), doc.clone());
        self.notify(path, &doc).await;
        Ok(())
    }

    async fn merge(&self, path: &str, fields: Map<String, Value>) -> Result<(), AppError> {
        self.consume_injected_failure()?;
        let merged = {
            let mut docs = self.docs.write().await;
            let entry = docs
                .entry(path.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(obj) = entry {
                for (k, v) in fields {
                    obj.insert(k, v);
                }
            }
            entry.clone()
        };
        self.notify(path, &merged).await;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), AppError> {
        self.consume_injected_failure()?;
        self.docs.write().await.remove(path);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<(String, Document)>, AppError> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .filter(|(path, _)| path.starts_with(prefix))
            .map(|(path, doc)| (path.clone(), doc.clone()))
            .collect())
    }

    async fn subscribe(&self, path: &str) -> Result<Subscription, AppError> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();

        // Primeiro valor: o snapshot corrente, se o documento existir.
        if let Some(doc) = self.docs.read().await.get(path) {
            let _ = tx.try_send(doc.clone());
        }

        self.watchers
            .lock()
            .await
            .entry(path.to_string())
            .or_default()
            .push(Watcher {
                tx,
                token: token.clone(),
            });

        Ok(Subscription::new(rx, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn primeiro_valor_da_assinatura_eh_o_snapshot() {
        let store = MemoryStore::new();
        store
            .set("tenants/x/status/d1", json!({ "state": "EN_ROUTE" }))
            .await
            .unwrap();

        let mut sub = store.subscribe("tenants/x/status/d1").await.unwrap();
        let first = sub.next().await.unwrap();
        assert_eq!(first["state"], "EN_ROUTE");

        store
            .set("tenants/x/status/d1", json!({ "state": "LOADING" }))
            .await
            .unwrap();
        let second = sub.next().await.unwrap();
        assert_eq!(second["state"], "LOADING");
    }

    #[tokio::test]
    async fn merge_preserva_os_demais_campos() {
        let store = MemoryStore::new();
        store
            .set("doc", json!({ "a": 1, "b": 2 }))
            .await
            .unwrap();

        let mut fields = Map::new();
        fields.insert("b".to_string(), json!(9));
        store.merge("doc", fields).await.unwrap();

        let doc = store.get("doc").await.unwrap().unwrap();
        assert_eq!(doc["a"], 1);
        assert_eq!(doc["b"], 9);
    }

    #[tokio::test]
    async fn falha_injetada_vira_transient_store() {
        let store = MemoryStore::new();
        store.inject_write_failures(1);
        let err = store.set("doc", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::TransientStore(_)));
        // A próxima escrita volta ao normal.
        store.set("doc", json!({})).await.unwrap();
    }

    #[tokio::test]
    async fn list_filtra_por_prefixo() {
        let store = MemoryStore::new();
        store.set("a/1", json!(1)).await.unwrap();
        store.set("a/2", json!(2)).await.unwrap();
        store.set("b/1", json!(3)).await.unwrap();
        let listed = store.list("a/").await.unwrap();
        assert_eq!(listed.len(), 2);
    }
}
