// src/db/driver_repo.rs

use std::sync::Arc;

use uuid::Uuid;

use crate::{
    common::{error::AppError, identity::normalize_phone},
    db::remote::{paths, with_retry, RemoteStore},
    models::driver::{Driver, Role},
};

#[derive(Clone)]
pub struct DriverRepository {
    store: Arc<dyn RemoteStore>,
}

impl DriverRepository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, tenant: &Uuid, driver: &str) -> Result<Option<Driver>, AppError> {
        match self.store.get(&paths::driver(tenant, driver)).await? {
            Some(doc) => Ok(Some(serde_json::from_value(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, tenant: &Uuid) -> Result<Vec<Driver>, AppError> {
        let mut drivers = Vec::new();
        for (path, doc) in self.store.list(&paths::drivers_prefix(tenant)).await? {
            match serde_json::from_value::<Driver>(doc) {
                Ok(driver) => drivers.push(driver),
                Err(e) => tracing::warn!("Motorista malformado em {}: {}", path, e),
            }
        }
        Ok(drivers)
    }

    pub async fn list_active(&self, tenant: &Uuid) -> Result<Vec<Driver>, AppError> {
        Ok(self
            .list(tenant)
            .await?
            .into_iter()
            .filter(|d| d.active)
            .collect())
    }

    // Grava o motorista garantindo os invariantes de cadastro:
    // - exatamente um registro ativo por (base, telefone normalizado);
    // - superadmin é único e o papel não muda depois de criado.
    pub async fn save(&self, tenant: &Uuid, driver: &Driver) -> Result<(), AppError> {
        let mut driver = driver.clone();
        driver.phone = normalize_phone(&driver.phone);

        let existing = self.list(tenant).await?;

        if driver.active && !driver.phone.is_empty() {
            let duplicate = existing
                .iter()
                .any(|d| d.id != driver.id && d.active && d.phone == driver.phone);
            if duplicate {
                return Err(AppError::DuplicatePhone {
                    phone: driver.phone.clone(),
                });
            }
        }

        if let Some(current) = existing.iter().find(|d| d.id == driver.id) {
            if current.role == Role::Superadmin && driver.role != Role::Superadmin {
                return Err(AppError::ValidationError({
                    let mut errors = validator::ValidationErrors::new();
                    errors.add(
                        "role",
                        validator::ValidationError::new("superadmin_imutavel")
                            .with_message("O papel superadmin é imutável.".into()),
                    );
                    errors
                }));
            }
        } else if driver.role == Role::Superadmin
            && existing.iter().any(|d| d.role == Role::Superadmin)
        {
            return Err(AppError::ValidationError({
                let mut errors = validator::ValidationErrors::new();
                errors.add(
                    "role",
                    validator::ValidationError::new("superadmin_unico")
                        .with_message("Já existe um superadmin.".into()),
                );
                errors
            }));
        }

        let path = paths::driver(tenant, &driver.id);
        let doc = serde_json::to_value(&driver)?;
        with_retry("driver.save", || {
            let doc = doc.clone();
            let path = path.clone();
            async move { self.store.set(&path, doc).await }
        })
        .await
    }
}
