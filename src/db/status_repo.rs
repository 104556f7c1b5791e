// src/db/status_repo.rs

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Map};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::remote::{paths, with_retry, RemoteStore, Subscription},
    models::geofence::GeoPoint,
    models::status::StatusRecord,
};

// O StatusStore do núcleo: CRUD + assinatura sobre o registro operacional
// de UM motorista. É a folha de que todos os outros componentes dependem.
#[derive(Clone)]
pub struct StatusRepository {
    store: Arc<dyn RemoteStore>,
}

impl StatusRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tenant: &Uuid, driver: &str) -> Result<Option<StatusRecord>, AppError> {
        match self.store.get(&paths::status(tenant, driver)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    /// Upsert do documento inteiro, com retry para falha transitória.
    pub async fn save(
        &self,
        tenant: &Uuid,
        driver: &str,
        record: &StatusRecord,
    ) -> Result<(), AppError> {
        let path = paths::status(tenant, driver);
        let doc = serde_json::to_value(record)?;
        with_retry("status.save", || {
            let doc = doc.clone();
            let path = path.clone();
            async move { self.store.set(&path, doc).await }
        })
        .await
    }

    /// Confirmação de leitura do motorista: atualização de campo avulso.
    /// De propósito NÃO passa pelo caminho de transição: pelo invariante
    /// de idempotência, mexer só no acknowledgedAt não é transição.
    pub async fn ack(&self, tenant: &Uuid, driver: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut fields = Map::new();
        fields.insert("acknowledgedAt".to_string(), json!(at));
        self.store
            .merge(&paths::status(tenant, driver), fields)
            .await
    }

    /// Seguir o registro em tempo real. É o caminho dos adaptadores que
    /// servem os apps; dentro deste binário só os testes de contrato
    /// consomem a assinatura.
    pub async fn subscribe(&self, tenant: &Uuid, driver: &str) -> Result<Subscription, AppError> {
        self.store.subscribe(&paths::status(tenant, driver)).await
    }

    // --- Última posição reportada pelo aparelho ---

    pub async fn set_location(
        &self,
        tenant: &Uuid,
        driver: &str,
        point: &GeoPoint,
    ) -> Result<(), AppError> {
        self.store
            .set(&paths::location(tenant, driver), serde_json::to_value(point)?)
            .await
    }

    pub async fn get_location(
        &self,
        tenant: &Uuid,
        driver: &str,
    ) -> Result<Option<GeoPoint>, AppError> {
        match self.store.get(&paths::location(tenant, driver)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::status::{DriverState, StatusRecord};

    #[tokio::test]
    async fn assinatura_entrega_o_snapshot_e_depois_as_mudancas() {
        let repo = StatusRepository::new(Arc::new(MemoryStore::new()));
        let tenant = Uuid::new_v4();
        repo.save(&tenant, "d1", &StatusRecord::scheduled())
            .await
            .unwrap();

        // Primeiro valor: o snapshot corrente, não uma "mudança".
        let mut sub = repo.subscribe(&tenant, "d1").await.unwrap();
        let first: StatusRecord =
            serde_json::from_value(sub.next().await.unwrap()).unwrap();
        assert_eq!(first.state, DriverState::EnRoute);

        let mut loading = StatusRecord::scheduled();
        loading.state = DriverState::Loading;
        loading.vaga = Some("03".into());
        repo.save(&tenant, "d1", &loading).await.unwrap();

        let second: StatusRecord =
            serde_json::from_value(sub.next().await.unwrap()).unwrap();
        assert_eq!(second.state, DriverState::Loading);
        assert_eq!(second.vaga.as_deref(), Some("03"));
    }

    #[tokio::test]
    async fn ack_nao_apaga_o_resto_do_documento() {
        let repo = StatusRepository::new(Arc::new(MemoryStore::new()));
        let tenant = Uuid::new_v4();
        let mut record = StatusRecord::scheduled();
        record.vaga = Some("07".into());
        repo.save(&tenant, "d1", &record).await.unwrap();

        repo.ack(&tenant, "d1", Utc::now()).await.unwrap();

        let read = repo.get(&tenant, "d1").await.unwrap().unwrap();
        assert!(read.acknowledged_at.is_some());
        assert_eq!(read.vaga.as_deref(), Some("07"));
        assert_eq!(read.state, DriverState::EnRoute);
    }
}
