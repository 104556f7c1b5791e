// src/services/availability_service.rs

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        identity::{is_numeric_id, is_placeholder_name},
    },
    db::{AvailabilityRepository, DriverRepository},
    models::availability::{AvailabilityPoll, PollEntry},
};

// Lista de disponibilidade do dia seguinte. A fonte de motoristas é o
// cadastro, mas listas antigas carregam lixo histórico (o mesmo motorista
// com id numérico legado e id novo, nomes placeholder), então toda mutação
// termina com a deduplicação por telefone normalizado.
#[derive(Clone)]
pub struct AvailabilityService {
    repo: AvailabilityRepository,
    driver_repo: DriverRepository,
}

impl AvailabilityService {
    pub fn new(repo: AvailabilityRepository, driver_repo: DriverRepository) -> Self {
        Self { repo, driver_repo }
    }

    /// Lista do dia, criada do cadastro ativo se ainda não existir. A lista
    /// existente também passa pela deduplicação antes de ser devolvida,
    /// para sanear documentos gravados antes da regra.
    pub async fn ensure_poll(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
    ) -> Result<AvailabilityPoll, AppError> {
        let mut poll = match self.repo.get(tenant, date).await? {
            Some(poll) => poll,
            None => {
                let mut poll = AvailabilityPoll::new(date);
                for driver in self.driver_repo.list_active(tenant).await? {
                    poll.entries.push(PollEntry {
                        driver_id: driver.id,
                        name: driver.name,
                        phone: driver.phone,
                        available: None,
                        responded_at: None,
                    });
                }
                tracing::info!(
                    "Lista de disponibilidade criada para {} com {} motoristas",
                    date,
                    poll.entries.len()
                );
                poll
            }
        };

        let before = poll.entries.len();
        poll.entries = deduplicate(poll.entries);
        if poll.entries.len() != before {
            tracing::info!(
                "Deduplicação removeu {} entradas da lista de {}",
                before - poll.entries.len(),
                date
            );
        }
        self.repo.save(tenant, &poll).await?;
        Ok(poll)
    }

    /// Resposta do motorista. A entrada precisa existir na lista do dia.
    pub async fn record_response(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        driver_id: &str,
        available: bool,
    ) -> Result<AvailabilityPoll, AppError> {
        let mut poll = self
            .repo
            .get(tenant, date)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Lista de disponibilidade".to_string()))?;

        let entry = poll
            .entries
            .iter_mut()
            .find(|e| e.driver_id == driver_id)
            .ok_or_else(|| AppError::ResourceNotFound("Motorista na lista".to_string()))?;
        entry.available = Some(available);
        entry.responded_at = Some(Utc::now());

        poll.entries = deduplicate(poll.entries);
        self.repo.save(tenant, &poll).await?;
        Ok(poll)
    }
}

/// Deduplicação por telefone normalizado. Em cada grupo sobrevive a entrada
/// de maior pontuação; empate fica com a primeira vista. A ordem relativa
/// dos sobreviventes segue a primeira ocorrência de cada grupo.
pub fn deduplicate(entries: Vec<PollEntry>) -> Vec<PollEntry> {
    // chave -> índice no vetor de sobreviventes, preservando a ordem de
    // primeira ocorrência.
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut survivors: Vec<(PollEntry, i32)> = Vec::new();

    for entry in entries {
        let key = entry.dedup_key();
        let score = score(&entry);
        match index.get(&key) {
            Some(&i) => {
                // Empate mantém a incumbente (a primeira vista).
                if score > survivors[i].1 {
                    survivors[i] = (entry, score);
                }
            }
            None => {
                index.insert(key, survivors.len());
                survivors.push((entry, score));
            }
        }
    }
    survivors.into_iter().map(|(e, _)| e).collect()
}

// Pontuação de qualidade da entrada: id de app (não numérico) vale mais
// que id legado; nome real vale mais que placeholder; ter telefone
// desempata com quem não tem.
fn score(entry: &PollEntry) -> i32 {
    let mut score = 0;
    if !is_numeric_id(&entry.driver_id) {
        score += 100;
    }
    if !is_placeholder_name(&entry.name) {
        score += 10;
    }
    if !entry.phone.trim().is_empty() {
        score += 5;
    }
    score
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::driver::{Driver, Role};

    fn entry(id: &str, name: &str, phone: &str) -> PollEntry {
        PollEntry {
            driver_id: id.to_string(),
            name: name.to_string(),
            phone: phone.to_string(),
            available: None,
            responded_at: None,
        }
    }

    #[test]
    fn sobrevive_a_entrada_de_maior_pontuacao() {
        // Mesmo telefone em três formatos; o registro de app com nome real
        // ganha do legado numérico e do placeholder.
        let survivors = deduplicate(vec![
            entry("1042", "Motorista", "(21) 99999-0000"),
            entry("abc-123", "João da Silva", "21 99999 0000"),
            entry("1043", "Sem Nome", "21999990000"),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].driver_id, "abc-123");
        assert_eq!(survivors[0].name, "João da Silva");
    }

    #[test]
    fn empate_fica_com_a_primeira_vista() {
        let survivors = deduplicate(vec![
            entry("abc-1", "João", "21999990000"),
            entry("abc-2", "Maria", "21999990000"),
        ]);
        assert_eq!(survivors.len(), 1);
        assert_eq!(survivors[0].driver_id, "abc-1");
    }

    #[test]
    fn sem_telefone_cada_entrada_fica_sozinha() {
        let survivors = deduplicate(vec![
            entry("a", "João", ""),
            entry("b", "Maria", ""),
        ]);
        assert_eq!(survivors.len(), 2);
    }

    #[test]
    fn resultado_tem_no_maximo_uma_entrada_por_telefone() {
        let survivors = deduplicate(vec![
            entry("1", "A", "21999990000"),
            entry("2", "B", "21888880000"),
            entry("3", "C", "(21)99999-0000"),
            entry("4", "D", ""),
            entry("5", "E", "21 88888 0000"),
        ]);
        let keys: HashSet<String> = survivors.iter().map(|e| e.dedup_key()).collect();
        assert_eq!(keys.len(), survivors.len());
        // Ordem de primeira ocorrência dos grupos preservada.
        let ids: Vec<&str> = survivors.iter().map(|e| e.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);
    }

    #[tokio::test]
    async fn lista_nova_vem_do_cadastro_ativo() {
        let remote: Arc<dyn crate::db::remote::RemoteStore> = Arc::new(MemoryStore::new());
        let driver_repo = DriverRepository::new(remote.clone());
        let service =
            AvailabilityService::new(AvailabilityRepository::new(remote), driver_repo.clone());
        let tenant = Uuid::new_v4();

        for (id, phone, active) in [
            ("d1", "21999990001", true),
            ("d2", "21999990002", true),
            ("d3", "21999990003", false),
        ] {
            driver_repo
                .save(
                    &tenant,
                    &Driver {
                        id: id.to_string(),
                        name: format!("Motorista {id}"),
                        phone: phone.to_string(),
                        role: Role::Driver,
                        active,
                        modality: None,
                    },
                )
                .await
                .unwrap();
        }

        let amanha = Utc::now().date_naive() + chrono::Duration::days(1);
        let poll = service.ensure_poll(&tenant, amanha).await.unwrap();
        // Só os ativos entram.
        assert_eq!(poll.entries.len(), 2);

        // Chamada repetida lê a lista persistida, não recria.
        let again = service.ensure_poll(&tenant, amanha).await.unwrap();
        assert_eq!(again.entries.len(), 2);
    }

    #[tokio::test]
    async fn resposta_marca_a_entrada_e_rededuplica() {
        let remote: Arc<dyn crate::db::remote::RemoteStore> = Arc::new(MemoryStore::new());
        let repo = AvailabilityRepository::new(remote.clone());
        let service =
            AvailabilityService::new(repo.clone(), DriverRepository::new(remote));
        let tenant = Uuid::new_v4();
        let hoje = Utc::now().date_naive();

        // Lista pré-existente com uma duplicata legada.
        let mut poll = AvailabilityPoll::new(hoje);
        poll.entries = vec![
            entry("1042", "Motorista", "21999990000"),
            entry("abc-123", "João da Silva", "21999990000"),
        ];
        repo.save(&tenant, &poll).await.unwrap();

        let poll = service
            .record_response(&tenant, hoje, "abc-123", true)
            .await
            .unwrap();
        assert_eq!(poll.entries.len(), 1);
        assert_eq!(poll.entries[0].driver_id, "abc-123");
        assert_eq!(poll.entries[0].available, Some(true));
        assert!(poll.entries[0].responded_at.is_some());
    }
}
