// src/config.rs

use std::{env, sync::Arc};

use tokio::sync::Notify;

use crate::{
    db::{
        memory::MemoryStore, remote::RemoteStore, AvailabilityRepository, DriverRepository,
        EscalaRepository, QuinzenaRepository, StatusRepository, TenantRepository,
    },
    push::{HttpPushSender, PushSender},
    services::{
        AvailabilityService, DispatchService, EscalaService, GeofenceService, NotificationService,
        PresenceMap, QuinzenaService, TenancyService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub jwt_secret: String,
    pub escala_service: EscalaService,
    pub dispatch_service: Arc<DispatchService>,
    pub availability_service: AvailabilityService,
    pub quinzena_service: QuinzenaService,
    pub tenancy_service: TenancyService,
    pub driver_repo: DriverRepository,
    pub status_repo: StatusRepository,
    pub notification_service: Arc<NotificationService>,
    pub geofence_service: Arc<GeofenceService>,
}

impl AppState {
    // Monta o gráfico de dependências inteiro. Se a configuração estiver
    // incompleta a aplicação não deve subir, então tudo propaga com `?`.
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| anyhow::anyhow!("JWT_SECRET deve ser definida"))?;
        let push_url = env::var("PUSH_API_URL")
            .map_err(|_| anyhow::anyhow!("PUSH_API_URL deve ser definida"))?;
        let push_key = env::var("PUSH_API_KEY")
            .map_err(|_| anyhow::anyhow!("PUSH_API_KEY deve ser definida"))?;

        // O adaptador concreto do armazenamento remoto entra aqui. O
        // substrato em memória atende um processo único; trocar por outro
        // backend é implementar o trait RemoteStore.
        let store: Arc<dyn RemoteStore> = Arc::new(MemoryStore::new());
        let push: Arc<dyn PushSender> = Arc::new(HttpPushSender::new(push_url, push_key));

        Ok(Self::with_backends(jwt_secret, store, push))
    }

    /// Montagem a partir de backends já construídos (também usada nos
    /// testes, com dublês).
    pub fn with_backends(
        jwt_secret: String,
        store: Arc<dyn RemoteStore>,
        push: Arc<dyn PushSender>,
    ) -> Self {
        let status_repo = StatusRepository::new(store.clone());
        let escala_repo = EscalaRepository::new(store.clone());
        let driver_repo = DriverRepository::new(store.clone());
        let tenant_repo = TenantRepository::new(store.clone());

        let geofence_poke = Arc::new(Notify::new());
        let geofence_presence = PresenceMap::new();
        let notification_service = Arc::new(NotificationService::new(push, store.clone()));
        let quinzena_service = QuinzenaService::new(QuinzenaRepository::new(store.clone()));
        let dispatch_service = Arc::new(DispatchService::new(
            status_repo.clone(),
            escala_repo.clone(),
            quinzena_service.clone(),
            notification_service.clone(),
            geofence_presence.clone(),
        ));
        let escala_service = EscalaService::new(
            escala_repo.clone(),
            status_repo.clone(),
            driver_repo.clone(),
            geofence_presence.clone(),
            geofence_poke.clone(),
        );
        let availability_service = AvailabilityService::new(
            AvailabilityRepository::new(store),
            driver_repo.clone(),
        );
        let tenancy_service = TenancyService::new(tenant_repo.clone());
        let geofence_service = Arc::new(GeofenceService::new(
            status_repo.clone(),
            escala_repo,
            tenant_repo,
            dispatch_service.clone(),
            geofence_presence,
            geofence_poke,
        ));

        Self {
            jwt_secret,
            escala_service,
            dispatch_service,
            availability_service,
            quinzena_service,
            tenancy_service,
            driver_repo,
            status_repo,
            notification_service,
            geofence_service,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Utc};

    use super::*;
    use crate::models::driver::{Driver, Role};
    use crate::models::escala::{Period, WaveKind};
    use crate::models::geofence::{GeoPoint, YardZones, Zone};
    use crate::models::status::DriverState;
    use crate::push::test_support::RecordingPushSender;

    // O dia inteiro de um motorista, do registro da base à quinzena,
    // passando pela montagem da escala, pela chegada por geofence e pelas
    // chamadas do despachante.
    #[tokio::test]
    async fn jornada_completa_do_patio() {
        let push = Arc::new(RecordingPushSender::new());
        let state = AppState::with_backends(
            "segredo-de-teste".to_string(),
            Arc::new(MemoryStore::new()),
            push.clone(),
        );
        let hoje = Utc::now().date_naive();

        // Base aprovada com zona de pátio configurada.
        let base = state
            .tenancy_service
            .register("Base Zona Oeste".into(), None)
            .await
            .unwrap();
        state.tenancy_service.approve(&base.id).await.unwrap();
        let patio = GeoPoint {
            lat: -22.9068,
            lon: -43.1729,
        };
        state
            .tenancy_service
            .set_zones(
                &base.id,
                &YardZones {
                    yard: Some(Zone {
                        center: patio,
                        radius_m: 200.0,
                    }),
                    parking: None,
                },
            )
            .await
            .unwrap();

        // Cadastro e escala: onda com horário, motorista sem vaga ainda.
        state
            .driver_repo
            .save(
                &base.id,
                &Driver {
                    id: "d1".into(),
                    name: "João da Silva".into(),
                    phone: "21999990000".into(),
                    role: Role::Driver,
                    active: true,
                    modality: None,
                },
            )
            .await
            .unwrap();
        state
            .escala_service
            .add_wave(&base.id, hoje, Period::Morning, None, WaveKind::Normal)
            .await
            .unwrap();
        state
            .escala_service
            .set_wave_time(&base.id, hoje, Period::Morning, 0, "08:00")
            .await
            .unwrap();
        state
            .escala_service
            .assign_driver(&base.id, hoje, Period::Morning, 0, "d1", None, None, None)
            .await
            .unwrap();

        let status = state.status_repo.get(&base.id, "d1").await.unwrap().unwrap();
        assert_eq!(status.state, DriverState::EnRoute);
        assert_eq!(status.message, "escalado");

        // Chegada ao pátio via geofence: ARRIVED, sem push.
        state
            .status_repo
            .set_location(&base.id, "d1", &patio)
            .await
            .unwrap();
        state.geofence_service.run_cycle().await.unwrap();
        let status = state.status_repo.get(&base.id, "d1").await.unwrap().unwrap();
        assert_eq!(status.state, DriverState::Arrived);
        assert_eq!(push.sent_count().await, 0);

        // Chamada para a vaga 03, rota A-1: exatamente um push.
        state
            .dispatch_service
            .call_to_slot(&base.id, "d1", "03", Some("A-1"))
            .await
            .unwrap();
        assert_eq!(push.sent_count().await, 1);
        {
            let sent = push.sent.lock().await;
            assert_eq!(sent[0].data["vaga"], "03");
            assert_eq!(sent[0].data["rota"], "A-1");
        }

        // Conclusão: DONE e exatamente um dia creditado na quinzena.
        state
            .dispatch_service
            .mark_complete(&base.id, "d1", hoje)
            .await
            .unwrap();
        let status = state.status_repo.get(&base.id, "d1").await.unwrap().unwrap();
        assert_eq!(status.state, DriverState::Done);

        let quinzena = state
            .quinzena_service
            .get(&base.id, "d1", hoje.month(), hoje.year())
            .await
            .unwrap();
        let (primeira, segunda) = quinzena.counts();
        assert_eq!(primeira + segunda, 1);
    }
}
