// src/db/quinzena_repo.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::remote::{paths, with_retry, RemoteStore},
    models::quinzena::Quinzena,
};

#[derive(Clone)]
pub struct QuinzenaRepository {
    store: Arc<dyn RemoteStore>,
}

impl QuinzenaRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Quinzena do motorista no mês; documento novo se ainda não existir.
    pub async fn get_or_new(
        &self,
        tenant: &Uuid,
        driver: &str,
        month: u32,
        year: i32,
    ) -> Result<Quinzena, AppError> {
        match self
            .store
            .get(&paths::quinzena(tenant, driver, month, year))
            .await?
        {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Ok(Quinzena::new(month, year)),
        }
    }

    pub async fn save(
        &self,
        tenant: &Uuid,
        driver: &str,
        quinzena: &Quinzena,
    ) -> Result<(), AppError> {
        let path = paths::quinzena(tenant, driver, quinzena.month, quinzena.year);
        let doc = serde_json::to_value(quinzena)?;
        with_retry("quinzena.save", || {
            let doc = doc.clone();
            let path = path.clone();
            async move { self.store.set(&path, doc).await }
        })
        .await
    }
}
