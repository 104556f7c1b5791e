// src/services/tenancy_service.rs

use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::TenantRepository,
    models::{
        geofence::YardZones,
        tenancy::{Tenant, TenantApproval},
    },
};

// Ciclo de vida da base: registro pendente, aprovação pelo superadmin e
// rejeição com remoção em cascata de tudo que a base acumulou.
#[derive(Clone)]
pub struct TenancyService {
    repo: TenantRepository,
}

impl TenancyService {
    pub fn new(repo: TenantRepository) -> Self {
        Self { repo }
    }

    pub async fn register(
        &self,
        name: String,
        theme: Option<serde_json::Value>,
    ) -> Result<Tenant, AppError> {
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name,
            approval: TenantApproval::Pending,
            theme,
        };
        self.repo.save(&tenant).await?;
        tracing::info!("Base {} registrada como pendente ({})", tenant.name, tenant.id);
        Ok(tenant)
    }

    pub async fn approve(&self, id: &Uuid) -> Result<Tenant, AppError> {
        let mut tenant = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Base".to_string()))?;
        tenant.approval = TenantApproval::Active;
        self.repo.save(&tenant).await?;
        tracing::info!("Base {} aprovada", id);
        Ok(tenant)
    }

    /// Rejeita o registro e apaga a base com todas as coleções filhas.
    pub async fn reject(&self, id: &Uuid) -> Result<(), AppError> {
        if self.repo.get(id).await?.is_none() {
            return Err(AppError::ResourceNotFound("Base".to_string()));
        }
        self.repo.delete_cascade(id).await?;
        tracing::info!("Base {} rejeitada e removida em cascata", id);
        Ok(())
    }

    pub async fn get(&self, id: &Uuid) -> Result<Option<Tenant>, AppError> {
        self.repo.get(id).await
    }

    pub async fn list(&self) -> Result<Vec<Tenant>, AppError> {
        self.repo.list().await
    }

    pub async fn get_zones(&self, id: &Uuid) -> Result<YardZones, AppError> {
        self.repo.get_zones(id).await
    }

    pub async fn set_zones(&self, id: &Uuid, zones: &YardZones) -> Result<(), AppError> {
        self.repo.set_zones(id, zones).await
    }
}
