// src/db/availability_repo.rs

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::remote::{paths, with_retry, RemoteStore},
    models::availability::AvailabilityPoll,
};

#[derive(Clone)]
pub struct AvailabilityRepository {
    store: Arc<dyn RemoteStore>,
}

impl AvailabilityRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn get(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityPoll>, AppError> {
        match self.store.get(&paths::availability(tenant, date)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn save(&self, tenant: &Uuid, poll: &AvailabilityPoll) -> Result<(), AppError> {
        let path = paths::availability(tenant, poll.date);
        let doc = serde_json::to_value(poll)?;
        with_retry("availability.save", || {
            let doc = doc.clone();
            let path = path.clone();
            async move { self.store.set(&path, doc).await }
        })
        .await
    }
}
