// src/services/geofence_service.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EscalaRepository, StatusRepository, TenantRepository},
    models::{
        escala::Period,
        geofence::{Zone, ZoneKind},
        tenancy::TenantApproval,
    },
    services::DispatchService,
};

// Cadência do laço: curta enquanto há motorista com ciclo aberto, longa
// quando o pátio está parado.
const ACTIVE_PERIOD: Duration = Duration::from_secs(60);
const IDLE_PERIOD: Duration = Duration::from_secs(300);

// Presença observada no último ciclo, por (base, motorista, zona). O mapa
// é compartilhado com os caminhos que reiniciam o ciclo do motorista
// (escalar, remover, reset): reescrever o status para a forma inicial
// rearma a borda, senão um motorista que nunca saiu da zona não voltaria a
// disparar. O avaliador também poda as entradas de quem saiu da escala, o
// que mantém o mapa limitado ao turno corrente.
#[derive(Clone, Default)]
pub struct PresenceMap {
    inner: Arc<Mutex<HashMap<(Uuid, String, ZoneKind), bool>>>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra a observação e devolve a anterior (ausente conta como fora).
    async fn observe(&self, key: (Uuid, String, ZoneKind), inside: bool) -> bool {
        self.inner.lock().await.insert(key, inside).unwrap_or(false)
    }

    /// Esquece o motorista: a próxima observação dentro de uma zona volta
    /// a contar como borda de entrada.
    pub(crate) async fn forget_driver(&self, tenant: &Uuid, driver_id: &str) {
        self.inner
            .lock()
            .await
            .retain(|(t, d, _), _| t != tenant || d != driver_id);
    }

    /// Poda as entradas da base cujos motoristas saíram da escala de hoje.
    async fn retain_scheduled(&self, tenant: &Uuid, scheduled: &HashSet<String>) {
        self.inner
            .lock()
            .await
            .retain(|(t, d, _), _| t != tenant || scheduled.contains(d));
    }
}

// Avaliador de geofence. Laço de fundo que cruza a última posição
// reportada de cada motorista escalado com as zonas da base e dispara as
// transições automáticas na BORDA de entrada (fora -> dentro). Motorista
// parado dentro da zona não redispara: o flag de presença só rearma quando
// ele sai ou quando o ciclo dele recomeça.
pub struct GeofenceService {
    status_repo: StatusRepository,
    escala_repo: EscalaRepository,
    tenant_repo: TenantRepository,
    dispatch: Arc<DispatchService>,
    presence: PresenceMap,
    // Cutucada de ciclo imediato (ex.: motorista recém escalado).
    poke: Arc<Notify>,
}

impl GeofenceService {
    pub fn new(
        status_repo: StatusRepository,
        escala_repo: EscalaRepository,
        tenant_repo: TenantRepository,
        dispatch: Arc<DispatchService>,
        presence: PresenceMap,
        poke: Arc<Notify>,
    ) -> Self {
        Self {
            status_repo,
            escala_repo,
            tenant_repo,
            dispatch,
            presence,
            poke,
        }
    }

    /// Laço de fundo. Um ciclo com erro é logado e o laço continua; só o
    /// token de cancelamento encerra.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        tracing::info!("Avaliador de geofence iniciado");
        loop {
            let period = match self.run_cycle().await {
                Ok(any_open) => {
                    if any_open {
                        ACTIVE_PERIOD
                    } else {
                        IDLE_PERIOD
                    }
                }
                Err(e) => {
                    tracing::error!("Ciclo de geofence falhou: {}", e);
                    ACTIVE_PERIOD
                }
            };
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Avaliador de geofence encerrando");
                    break;
                }
                _ = self.poke.notified() => {}
                _ = tokio::time::sleep(period) => {}
            }
        }
    }

    /// Um ciclo completo sobre todas as bases ativas. Devolve se algum
    /// motorista ainda tem ciclo aberto (para a cadência adaptativa).
    pub async fn run_cycle(&self) -> Result<bool, AppError> {
        let mut any_open = false;
        for tenant in self.tenant_repo.list().await? {
            if tenant.approval != TenantApproval::Active {
                continue;
            }
            match self.evaluate_tenant(&tenant.id).await {
                Ok(open) => any_open |= open,
                Err(e) => {
                    tracing::error!("Geofence da base {} falhou: {}", tenant.id, e);
                }
            }
        }
        Ok(any_open)
    }

    async fn evaluate_tenant(&self, tenant: &Uuid) -> Result<bool, AppError> {
        let scheduled = self.scheduled_today(tenant).await?;
        self.presence.retain_scheduled(tenant, &scheduled).await;

        let zones = self.tenant_repo.get_zones(tenant).await?;
        let configured: Vec<(ZoneKind, Zone)> = [
            (ZoneKind::Yard, zones.yard),
            (ZoneKind::Parking, zones.parking),
        ]
        .into_iter()
        .filter_map(|(kind, z)| z.filter(Zone::is_configured).map(|z| (kind, z)))
        .collect();
        if configured.is_empty() {
            return Ok(false);
        }

        let mut any_open = false;
        for driver_id in scheduled {
            if let Err(e) = self
                .evaluate_driver(tenant, &driver_id, &configured, &mut any_open)
                .await
            {
                // Um motorista com dado ruim não pode travar os demais.
                tracing::warn!("Geofence de {} na base {} falhou: {}", driver_id, tenant, e);
            }
        }
        Ok(any_open)
    }

    async fn evaluate_driver(
        &self,
        tenant: &Uuid,
        driver_id: &str,
        zones: &[(ZoneKind, Zone)],
        any_open: &mut bool,
    ) -> Result<(), AppError> {
        let Some(status) = self.status_repo.get(tenant, driver_id).await? else {
            return Ok(());
        };
        if status.state.is_terminal() {
            return Ok(());
        }
        *any_open = true;

        let Some(point) = self.status_repo.get_location(tenant, driver_id).await? else {
            return Ok(());
        };

        for (kind, zone) in zones {
            let inside = zone.contains(&point);
            let key = (*tenant, driver_id.to_string(), *kind);
            let was_inside = self.presence.observe(key, inside).await;
            if inside && !was_inside {
                self.dispatch.on_zone_entered(tenant, driver_id, *kind).await?;
            }
        }
        Ok(())
    }

    /// União dos motoristas escalados nos dois turnos de hoje.
    async fn scheduled_today(&self, tenant: &Uuid) -> Result<HashSet<String>, AppError> {
        let today = Utc::now().date_naive();
        let mut drivers = HashSet::new();
        for period in [Period::Morning, Period::Afternoon] {
            if let Some(shift) = self.escala_repo.get(tenant, today, period).await? {
                for wave in &shift.waves {
                    for slot in &wave.slots {
                        drivers.insert(slot.driver_id.clone());
                    }
                }
            }
        }
        Ok(drivers)
    }
}
