// src/services/dispatch_service.rs

use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EscalaRepository, StatusRepository},
    models::{
        escala::Period,
        geofence::ZoneKind,
        status::{
            DriverState, StatusRecord, MSG_CARREGAMENTO_CONCLUIDO, MSG_CHAMADA_CARREGAMENTO,
            MSG_CHAMADA_ESTACIONAMENTO,
        },
    },
    services::{geofence_service::PresenceMap, NotificationService, QuinzenaService},
};

// Orquestra o ciclo operacional do motorista: chamadas do despachante,
// transições automáticas por geofence, conclusão e reset. Toda mutação
// segue a mesma disciplina: carregar o registro confirmado, montar o novo
// registro, persistir (com retry no repositório) e SÓ ENTÃO notificar.
// Assim uma falha de escrita nunca deixa push órfão, e uma falha de push
// nunca desfaz status.
pub struct DispatchService {
    status_repo: StatusRepository,
    escala_repo: EscalaRepository,
    quinzena: QuinzenaService,
    notifier: Arc<NotificationService>,
    // Rearmada no reset: sem isso, quem nunca saiu da zona não voltaria a
    // disparar a borda de entrada.
    presence: PresenceMap,
}

impl DispatchService {
    pub fn new(
        status_repo: StatusRepository,
        escala_repo: EscalaRepository,
        quinzena: QuinzenaService,
        notifier: Arc<NotificationService>,
        presence: PresenceMap,
    ) -> Self {
        Self {
            status_repo,
            escala_repo,
            quinzena,
            notifier,
            presence,
        }
    }

    async fn load_required(
        &self,
        tenant: &Uuid,
        driver: &str,
    ) -> Result<StatusRecord, AppError> {
        self.status_repo
            .get(tenant, driver)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Status do motorista".to_string()))
    }

    /// Chamada para carregamento: o motorista vai para LOADING com a vaga
    /// (e rota, se houver) informadas. Repetir a mesma chamada é inócuo: o
    /// registro novo fica idêntico e o dispatcher suprime o push.
    pub async fn call_to_slot(
        &self,
        tenant: &Uuid,
        driver: &str,
        vaga: &str,
        rota: Option<&str>,
    ) -> Result<StatusRecord, AppError> {
        let prev = self.load_required(tenant, driver).await?;
        if prev.state.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", prev.state),
            });
        }

        let next = StatusRecord {
            state: DriverState::Loading,
            message: MSG_CHAMADA_CARREGAMENTO.to_string(),
            vaga: Some(vaga.to_string()),
            rota: rota.map(String::from),
            // O início do carregamento é o da PRIMEIRA chamada; rechamar
            // para outra vaga não reinicia o relógio.
            loading_started_at: prev.loading_started_at.or_else(|| Some(Utc::now())),
            loading_ended_at: prev.loading_ended_at,
            acknowledged_at: None,
            updated_at: Utc::now(),
        };
        self.status_repo.save(tenant, driver, &next).await?;
        self.notifier
            .notify_transition(driver, Some(&prev), &next)
            .await;
        Ok(next)
    }

    /// Chamada para o estacionamento de espera: TO_PARKING, sem vaga.
    pub async fn call_to_parking(
        &self,
        tenant: &Uuid,
        driver: &str,
    ) -> Result<StatusRecord, AppError> {
        let prev = self.load_required(tenant, driver).await?;
        if prev.state.is_terminal() {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", prev.state),
            });
        }

        let next = StatusRecord {
            state: DriverState::ToParking,
            message: MSG_CHAMADA_ESTACIONAMENTO.to_string(),
            vaga: None,
            rota: None,
            loading_started_at: prev.loading_started_at,
            loading_ended_at: prev.loading_ended_at,
            acknowledged_at: None,
            updated_at: Utc::now(),
        };
        self.status_repo.save(tenant, driver, &next).await?;
        self.notifier
            .notify_transition(driver, Some(&prev), &next)
            .await;
        Ok(next)
    }

    /// Conclusão do carregamento. Só vale a partir de LOADING; além da
    /// transição, credita o dia trabalhado na quinzena do motorista. Se
    /// uma conclusão anterior gravou o DONE mas a quinzena falhou depois
    /// dos retries, repetir o complete no mesmo dia recupera só o crédito
    /// que faltou, sem novo push.
    pub async fn mark_complete(
        &self,
        tenant: &Uuid,
        driver: &str,
        today: NaiveDate,
    ) -> Result<StatusRecord, AppError> {
        let prev = self.load_required(tenant, driver).await?;

        if prev.state == DriverState::Done {
            let completed_today = prev
                .loading_ended_at
                .map(|t| t.date_naive() == today)
                .unwrap_or(false);
            if completed_today {
                let quinzena = self
                    .quinzena
                    .get(tenant, driver, today.month(), today.year())
                    .await?;
                if !quinzena.contains(today) {
                    self.quinzena
                        .register_worked_day(tenant, driver, today)
                        .await?;
                    return Ok(prev);
                }
            }
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", prev.state),
            });
        }
        if prev.state != DriverState::Loading {
            return Err(AppError::InvalidTransition {
                from: format!("{:?}", prev.state),
            });
        }

        let next = StatusRecord {
            state: DriverState::Done,
            message: MSG_CARREGAMENTO_CONCLUIDO.to_string(),
            vaga: prev.vaga.clone(),
            rota: prev.rota.clone(),
            loading_started_at: prev.loading_started_at,
            loading_ended_at: prev.loading_ended_at.or_else(|| Some(Utc::now())),
            acknowledged_at: prev.acknowledged_at,
            updated_at: Utc::now(),
        };
        self.status_repo.save(tenant, driver, &next).await?;
        // O push sai antes do crédito: se a quinzena falhar, o complete
        // repetido recupera o crédito sem reenviar o push.
        self.notifier
            .notify_transition(driver, Some(&prev), &next)
            .await;
        self.quinzena
            .register_worked_day(tenant, driver, today)
            .await?;
        Ok(next)
    }

    /// Reset do despachante: reescreve a forma inicial "escalado",
    /// qualquer que seja o estado corrente, e rearma a borda de geofence
    /// (um motorista parado dentro do pátio "chega" de novo no próximo
    /// ciclo). Repetir o reset não gera segundo push (registro idêntico).
    pub async fn reset_status(
        &self,
        tenant: &Uuid,
        driver: &str,
    ) -> Result<StatusRecord, AppError> {
        let prev = self.status_repo.get(tenant, driver).await?;
        let next = StatusRecord::scheduled();
        self.status_repo.save(tenant, driver, &next).await?;
        self.presence.forget_driver(tenant, driver).await;
        self.notifier
            .notify_transition(driver, prev.as_ref(), &next)
            .await;
        Ok(next)
    }

    /// Transição automática de entrada em zona. Só dois pares produzem
    /// mudança; qualquer outra combinação é ignorada (devolve false).
    pub async fn on_zone_entered(
        &self,
        tenant: &Uuid,
        driver: &str,
        zone: ZoneKind,
    ) -> Result<bool, AppError> {
        let Some(prev) = self.status_repo.get(tenant, driver).await? else {
            return Ok(false);
        };
        let new_state = match (zone, prev.state) {
            (ZoneKind::Yard, DriverState::EnRoute) => DriverState::Arrived,
            (ZoneKind::Parking, DriverState::ToParking) => DriverState::Parked,
            _ => return Ok(false),
        };

        let next = StatusRecord {
            state: new_state,
            updated_at: Utc::now(),
            ..prev.clone()
        };
        self.status_repo.save(tenant, driver, &next).await?;
        tracing::info!("Motorista {} entrou na zona {:?}: {:?}", driver, zone, new_state);
        // ARRIVED/PARKED não têm push mapeado; o dispatcher só loga.
        self.notifier
            .notify_transition(driver, Some(&prev), &next)
            .await;
        Ok(true)
    }

    /// Aviso em lote "você foi escalado" para todos os motoristas do turno.
    pub async fn notify_all_scheduled(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
    ) -> Result<usize, AppError> {
        let Some(shift) = self.escala_repo.get(tenant, date, period).await? else {
            return Err(AppError::ResourceNotFound("Turno".to_string()));
        };
        let driver_ids: Vec<String> = shift
            .waves
            .iter()
            .flat_map(|w| w.slots.iter().map(|s| s.driver_id.clone()))
            .collect();
        self.notifier.notify_scheduled_bulk(&driver_ids).await;
        Ok(driver_ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::QuinzenaRepository;
    use crate::models::escala::{Shift, Wave, WaveKind, WaveSlot};
    use crate::push::test_support::RecordingPushSender;
    use chrono::Datelike;

    fn build(
        store: MemoryStore,
    ) -> (DispatchService, Arc<RecordingPushSender>, StatusRepository) {
        let remote: Arc<dyn crate::db::remote::RemoteStore> = Arc::new(store);
        let push = Arc::new(RecordingPushSender::new());
        let status_repo = StatusRepository::new(remote.clone());
        let service = DispatchService::new(
            status_repo.clone(),
            EscalaRepository::new(remote.clone()),
            QuinzenaService::new(QuinzenaRepository::new(remote.clone())),
            Arc::new(NotificationService::new(push.clone(), remote)),
            PresenceMap::new(),
        );
        (service, push, status_repo)
    }

    #[tokio::test]
    async fn ciclo_completo_do_motorista() {
        let store = MemoryStore::new();
        let (service, push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        let hoje = Utc::now().date_naive();

        status_repo
            .save(&tenant, "d1", &StatusRecord::scheduled())
            .await
            .unwrap();

        // Chamada para carregamento: um push com vaga e rota.
        let record = service
            .call_to_slot(&tenant, "d1", "03", Some("A-1"))
            .await
            .unwrap();
        assert_eq!(record.state, DriverState::Loading);
        assert!(record.loading_started_at.is_some());
        assert_eq!(push.sent_count().await, 1);
        {
            let sent = push.sent.lock().await;
            assert_eq!(sent[0].data["type"], "chamada");
            assert_eq!(sent[0].data["vaga"], "03");
            assert_eq!(sent[0].data["rota"], "A-1");
        }

        // Repetir a mesma chamada: registro idêntico, push suprimido.
        service
            .call_to_slot(&tenant, "d1", "03", Some("A-1"))
            .await
            .unwrap();
        assert_eq!(push.sent_count().await, 1);

        // Conclusão: vira DONE, notifica e credita a quinzena.
        let record = service.mark_complete(&tenant, "d1", hoje).await.unwrap();
        assert_eq!(record.state, DriverState::Done);
        assert!(record.loading_ended_at.is_some());
        assert_eq!(push.sent_count().await, 2);

        let quinzena = service
            .quinzena
            .get(&tenant, "d1", hoje.month(), hoje.year())
            .await
            .unwrap();
        assert_eq!(quinzena.counts().0 + quinzena.counts().1, 1);
    }

    #[tokio::test]
    async fn concluir_fora_de_loading_eh_rejeitado() {
        let store = MemoryStore::new();
        let (service, _push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        status_repo
            .save(&tenant, "d1", &StatusRecord::scheduled())
            .await
            .unwrap();

        let err = service
            .mark_complete(&tenant, "d1", Utc::now().date_naive())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn complete_repetido_recupera_credito_perdido_da_quinzena() {
        let store = MemoryStore::new();
        let (service, push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        let hoje = Utc::now().date_naive();

        // Estado deixado por uma falha entre as duas escritas: DONE já
        // gravado, quinzena ainda sem o dia.
        let mut done = StatusRecord::scheduled();
        done.state = DriverState::Done;
        done.message = MSG_CARREGAMENTO_CONCLUIDO.to_string();
        done.loading_ended_at = Some(Utc::now());
        status_repo.save(&tenant, "d1", &done).await.unwrap();

        let record = service.mark_complete(&tenant, "d1", hoje).await.unwrap();
        assert_eq!(record.state, DriverState::Done);
        assert_eq!(push.sent_count().await, 0);
        let quinzena = service
            .quinzena
            .get(&tenant, "d1", hoje.month(), hoje.year())
            .await
            .unwrap();
        assert_eq!(quinzena.counts().0 + quinzena.counts().1, 1);

        // Com o crédito no lugar, repetir volta a ser transição inválida e
        // o dia não é creditado duas vezes.
        let err = service.mark_complete(&tenant, "d1", hoje).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        let quinzena = service
            .quinzena
            .get(&tenant, "d1", hoje.month(), hoje.year())
            .await
            .unwrap();
        assert_eq!(quinzena.counts().0 + quinzena.counts().1, 1);
    }

    #[tokio::test]
    async fn done_de_outro_dia_nao_ganha_credito() {
        let store = MemoryStore::new();
        let (service, _push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        let hoje = Utc::now().date_naive();

        let mut done = StatusRecord::scheduled();
        done.state = DriverState::Done;
        done.message = MSG_CARREGAMENTO_CONCLUIDO.to_string();
        done.loading_ended_at = Some(Utc::now() - chrono::TimeDelta::days(1));
        status_repo.save(&tenant, "d1", &done).await.unwrap();

        let err = service.mark_complete(&tenant, "d1", hoje).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));
        let quinzena = service
            .quinzena
            .get(&tenant, "d1", hoje.month(), hoje.year())
            .await
            .unwrap();
        assert_eq!(quinzena.counts(), (0, 0));
    }

    #[tokio::test]
    async fn reset_eh_idempotente_no_push() {
        let store = MemoryStore::new();
        let (service, push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        status_repo
            .save(&tenant, "d1", &StatusRecord::scheduled())
            .await
            .unwrap();
        service
            .call_to_slot(&tenant, "d1", "03", None)
            .await
            .unwrap();
        let depois_da_chamada = push.sent_count().await;

        // O reset reescreve "escalado". A mudança de estado conta como
        // transição mas EN_ROUTE não tem push mapeado.
        service.reset_status(&tenant, "d1").await.unwrap();
        assert_eq!(push.sent_count().await, depois_da_chamada);

        // Segundo reset: registro idêntico, nada acontece.
        service.reset_status(&tenant, "d1").await.unwrap();
        assert_eq!(push.sent_count().await, depois_da_chamada);

        let record = status_repo.get(&tenant, "d1").await.unwrap().unwrap();
        assert_eq!(record.state, DriverState::EnRoute);
        assert_eq!(record.message, "escalado");
    }

    #[tokio::test]
    async fn entrada_em_zona_so_transiciona_os_pares_mapeados() {
        let store = MemoryStore::new();
        let (service, push, status_repo) = build(store);
        let tenant = Uuid::new_v4();
        status_repo
            .save(&tenant, "d1", &StatusRecord::scheduled())
            .await
            .unwrap();

        // EN_ROUTE entrando no estacionamento: ignorado.
        assert!(!service
            .on_zone_entered(&tenant, "d1", ZoneKind::Parking)
            .await
            .unwrap());

        // EN_ROUTE entrando no pátio: vira ARRIVED, sem push.
        assert!(service
            .on_zone_entered(&tenant, "d1", ZoneKind::Yard)
            .await
            .unwrap());
        let record = status_repo.get(&tenant, "d1").await.unwrap().unwrap();
        assert_eq!(record.state, DriverState::Arrived);
        assert_eq!(push.sent_count().await, 0);

        // TO_PARKING entrando no estacionamento: vira PARKED.
        service.call_to_parking(&tenant, "d1").await.unwrap();
        assert!(service
            .on_zone_entered(&tenant, "d1", ZoneKind::Parking)
            .await
            .unwrap());
        let record = status_repo.get(&tenant, "d1").await.unwrap().unwrap();
        assert_eq!(record.state, DriverState::Parked);
    }

    #[tokio::test]
    async fn aviso_em_lote_cobre_todas_as_ondas() {
        let store = MemoryStore::new();
        let remote: Arc<dyn crate::db::remote::RemoteStore> = Arc::new(store.clone());
        let (service, push, _status_repo) = build(store);
        let tenant = Uuid::new_v4();
        let hoje = Utc::now().date_naive();

        let mut shift = Shift::new(hoje, Period::Morning);
        let mut w1 = Wave::new("Onda 1".into(), WaveKind::Normal);
        w1.slots.push(WaveSlot {
            driver_id: "d1".into(),
            driver_name: "D1".into(),
            vaga: None,
            rota: None,
            time: None,
            units: None,
        });
        let mut w2 = Wave::new("Dedicada".into(), WaveKind::Dedicated);
        w2.slots.push(WaveSlot {
            driver_id: "d2".into(),
            driver_name: "D2".into(),
            vaga: None,
            rota: None,
            time: None,
            units: None,
        });
        shift.waves = vec![w1, w2];
        EscalaRepository::new(remote).save(&tenant, &shift).await.unwrap();

        let count = service
            .notify_all_scheduled(&tenant, hoje, Period::Morning)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(push.sent_count().await, 2);
    }
}
