// src/db/tenancy_repo.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::remote::{paths, with_retry, RemoteStore},
    models::{geofence::YardZones, tenancy::Tenant},
};

#[derive(Clone)]
pub struct TenantRepository {
    store: Arc<dyn RemoteStore>,
}

impl TenantRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tenant: &Uuid) -> Result<Option<Tenant>, AppError> {
        match self.store.get(&paths::tenant(tenant)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, AppError> {
        let mut tenants = Vec::new();
        for (path, doc) in self.store.list("tenants/").await? {
            // O prefixo também devolve as coleções filhas; só o documento
            // raiz da base ("tenants/{uuid}") interessa aqui.
            if path.matches('/').count() != 1 {
                continue;
            }
            match serde_json::from_value::<Tenant>(doc) {
                Ok(tenant) => tenants.push(tenant),
                Err(e) => tracing::warn!("Base malformada em {}: {}", path, e),
            }
        }
        Ok(tenants)
    }

    pub async fn save(&self, tenant: &Tenant) -> Result<(), AppError> {
        let path = paths::tenant(&tenant.id);
        let doc = serde_json::to_value(tenant)?;
        with_retry("tenant.save", || {
            let doc = doc.clone();
            let path = path.clone();
            async move { self.store.set(&path, doc).await }
        })
        .await
    }

    /// Apaga a base e TODAS as coleções filhas (cadastro, status, turnos,
    /// disponibilidade, quinzenas). Usado na rejeição do registro.
    pub async fn delete_cascade(&self, tenant: &Uuid) -> Result<(), AppError> {
        for prefix in [
            paths::tenant_children(tenant),
            paths::availability_prefix(tenant),
            paths::quinzena_prefix(tenant),
        ] {
            for (path, _) in self.store.list(&prefix).await? {
                self.store.delete(&path).await?;
            }
        }
        self.store.delete(&paths::tenant(tenant)).await
    }

    // --- Zonas de geofence da base ---

    pub async fn get_zones(&self, tenant: &Uuid) -> Result<YardZones, AppError> {
        match self.store.get(&paths::zones(tenant)).await? {
            Some(doc) => Ok(serde_json::from_value(doc)?),
            None => Ok(YardZones::default()),
        }
    }

    pub async fn set_zones(&self, tenant: &Uuid, zones: &YardZones) -> Result<(), AppError> {
        self.store
            .set(&paths::zones(tenant), serde_json::to_value(zones)?)
            .await
    }
}
