// src/services/quinzena_service.rs

use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::{common::error::AppError, db::QuinzenaRepository, models::quinzena::Quinzena};

// Razão da quinzena: registrar dia trabalhado quando um carregamento é
// concluído e servir a consulta do fechamento. O registro é cego de
// propósito: cada conclusão empilha a data, mesmo repetida no mesmo dia,
// e a leitura expõe lista e contagem para auditoria.
#[derive(Clone)]
pub struct QuinzenaService {
    repo: QuinzenaRepository,
}

impl QuinzenaService {
    pub fn new(repo: QuinzenaRepository) -> Self {
        Self { repo }
    }

    pub async fn register_worked_day(
        &self,
        tenant: &Uuid,
        driver: &str,
        date: NaiveDate,
    ) -> Result<(), AppError> {
        let mut quinzena = self
            .repo
            .get_or_new(tenant, driver, date.month(), date.year())
            .await?;
        quinzena.push_date(date);
        self.repo.save(tenant, driver, &quinzena).await?;
        tracing::info!(
            "Dia trabalhado registrado para {} em {} ({}/{})",
            driver,
            date,
            quinzena.month,
            quinzena.year
        );
        Ok(())
    }

    pub async fn get(
        &self,
        tenant: &Uuid,
        driver: &str,
        month: u32,
        year: i32,
    ) -> Result<Quinzena, AppError> {
        self.repo.get_or_new(tenant, driver, month, year).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test]
    async fn duas_conclusoes_no_mesmo_dia_empilham_duas_datas() {
        let store = MemoryStore::new();
        let service = QuinzenaService::new(QuinzenaRepository::new(Arc::new(store)));
        let tenant = Uuid::new_v4();
        let dia = NaiveDate::from_ymd_opt(2026, 8, 10).unwrap();

        service.register_worked_day(&tenant, "d1", dia).await.unwrap();
        service.register_worked_day(&tenant, "d1", dia).await.unwrap();

        let quinzena = service.get(&tenant, "d1", 8, 2026).await.unwrap();
        assert_eq!(quinzena.counts(), (2, 0));
        assert_eq!(quinzena.first_half, vec!["2026-08-10", "2026-08-10"]);
    }
}
