// src/services/escala_service.rs

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{DriverRepository, EscalaRepository, StatusRepository},
    models::driver::Driver,
    models::escala::{
        format_hhmm, parse_hhmm, Period, Shift, Wave, WaveKind, WaveSlot, WAVE_STEP_MINUTES,
    },
    models::status::StatusRecord,
    services::geofence_service::PresenceMap,
};

// O motor de escala: monta e muda a estrutura de ondas/vagas do turno e
// recalcula os horários em cascata. Toda operação carrega o snapshot
// confirmado, muda uma cópia e só então grava; se a gravação falhar, o
// chamador continua com o snapshot anterior e recebe erro retentável.
#[derive(Clone)]
pub struct EscalaService {
    repo: EscalaRepository,
    status_repo: StatusRepository,
    driver_repo: DriverRepository,
    // Borda de geofence rearmada quando o ciclo do motorista recomeça
    // (escalar e remover passam por aqui).
    presence: PresenceMap,
    // Acorda o reconciliador de geofence para uma rodada imediata quando um
    // motorista entra na escala (quem já está dentro da zona não espera o
    // próximo período).
    geofence_poke: Arc<Notify>,
}

impl EscalaService {
    pub fn new(
        repo: EscalaRepository,
        status_repo: StatusRepository,
        driver_repo: DriverRepository,
        presence: PresenceMap,
        geofence_poke: Arc<Notify>,
    ) -> Self {
        Self {
            repo,
            status_repo,
            driver_repo,
            presence,
            geofence_poke,
        }
    }

    /// Turno do dia, criado de forma preguiçosa na primeira onda.
    async fn load_or_new(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
    ) -> Result<Shift, AppError> {
        Ok(self
            .repo
            .get(tenant, date, period)
            .await?
            .unwrap_or_else(|| Shift::new(date, period)))
    }

    async fn load_existing(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
    ) -> Result<Shift, AppError> {
        self.repo
            .get(tenant, date, period)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Turno".to_string()))
    }

    // --- Ondas ---

    /// Acrescenta uma onda ao fim do turno. O horário fica sem definir
    /// (o despachante preenche; a cascata deriva o resto).
    pub async fn add_wave(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
        name: Option<String>,
        kind: WaveKind,
    ) -> Result<Shift, AppError> {
        let mut shift = self.load_or_new(tenant, date, period).await?;
        let name = name.unwrap_or_else(|| format!("Onda {}", shift.waves.len() + 1));
        shift.waves.push(Wave::new(name, kind));
        self.repo.save(tenant, &shift).await?;
        Ok(shift)
    }

    /// Define o horário de uma onda e rederiva TODOS os horários das ondas
    /// seguintes (+20min em cadeia). Editar uma onda antiga reescreve o
    /// resto do dia, inclusive horários já definidos à mão.
    pub async fn set_wave_time(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
        wave_index: usize,
        time: &str,
    ) -> Result<Shift, AppError> {
        let minutes = parse_hhmm(time)
            .ok_or_else(|| AppError::InvalidTime(format!("\"{time}\" não está em HH:MM")))?;

        let mut shift = self.load_existing(tenant, date, period).await?;
        if wave_index >= shift.waves.len() {
            return Err(AppError::ResourceNotFound("Onda".to_string()));
        }

        cascade_times(&mut shift.waves, wave_index, minutes);
        self.repo.save(tenant, &shift).await?;
        Ok(shift)
    }

    // --- Vagas ---

    /// Escala um motorista numa onda. Conflito se ele já estiver em
    /// qualquer onda do turno (a mensagem nomeia a onda). Como efeito
    /// colateral o status do motorista volta à forma inicial "escalado".
    #[allow(clippy::too_many_arguments)]
    pub async fn assign_driver(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
        wave_index: usize,
        driver_id: &str,
        vaga: Option<String>,
        rota: Option<String>,
        units: Option<u32>,
    ) -> Result<Shift, AppError> {
        let mut shift = self.load_existing(tenant, date, period).await?;
        if wave_index >= shift.waves.len() {
            return Err(AppError::ResourceNotFound("Onda".to_string()));
        }

        if let Some((_, wave)) = shift.wave_of_driver(driver_id) {
            return Err(AppError::DriverAlreadyScheduled {
                onda: wave.name.clone(),
            });
        }

        let driver: Driver = self
            .driver_repo
            .get(tenant, driver_id)
            .await?
            .ok_or_else(|| AppError::ResourceNotFound("Motorista".to_string()))?;

        check_vaga_free(&shift.waves[wave_index], &vaga, driver_id)?;

        let wave = &mut shift.waves[wave_index];
        wave.slots.push(WaveSlot {
            driver_id: driver_id.to_string(),
            // Snapshot desnormalizado; reconciliado quando o cadastro muda.
            driver_name: driver.name.clone(),
            vaga,
            rota,
            time: wave.time.clone(),
            units,
        });
        wave.sort_slots();

        self.repo.save(tenant, &shift).await?;

        // Só depois da escala confirmada: reset do status, borda de
        // geofence rearmada e rodada imediata (quem já está dentro da zona
        // é reconciliado sem esperar o próximo período).
        self.status_repo
            .save(tenant, driver_id, &StatusRecord::scheduled())
            .await?;
        self.presence.forget_driver(tenant, driver_id).await;
        self.geofence_poke.notify_one();

        Ok(shift)
    }

    /// Atualização parcial da vaga: campo ausente mantém o valor anterior.
    pub async fn update_slot(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
        wave_index: usize,
        driver_id: &str,
        vaga: Option<String>,
        rota: Option<String>,
        units: Option<u32>,
    ) -> Result<Shift, AppError> {
        let mut shift = self.load_existing(tenant, date, period).await?;
        if wave_index >= shift.waves.len() {
            return Err(AppError::ResourceNotFound("Onda".to_string()));
        }

        if let Some(new_vaga) = &vaga {
            check_vaga_free(&shift.waves[wave_index], &Some(new_vaga.clone()), driver_id)?;
        }

        let wave = &mut shift.waves[wave_index];
        let slot = wave
            .slots
            .iter_mut()
            .find(|s| s.driver_id == driver_id)
            .ok_or_else(|| AppError::ResourceNotFound("Motorista na onda".to_string()))?;

        if let Some(v) = vaga {
            slot.vaga = Some(v);
        }
        if let Some(r) = rota {
            slot.rota = Some(r);
        }
        if let Some(u) = units {
            slot.units = Some(u);
        }
        wave.sort_slots();

        self.repo.save(tenant, &shift).await?;
        Ok(shift)
    }

    /// Tira o motorista da onda. Se ele sair de todas as ondas do turno, o
    /// registro de status é limpo (mensagem vazia) e o polling de geofence
    /// para de considerá-lo.
    pub async fn remove_driver(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
        wave_index: usize,
        driver_id: &str,
    ) -> Result<Shift, AppError> {
        let mut shift = self.load_existing(tenant, date, period).await?;
        if wave_index >= shift.waves.len() {
            return Err(AppError::ResourceNotFound("Onda".to_string()));
        }

        let wave = &mut shift.waves[wave_index];
        let before = wave.slots.len();
        wave.slots.retain(|s| s.driver_id != driver_id);
        if wave.slots.len() == before {
            return Err(AppError::ResourceNotFound("Motorista na onda".to_string()));
        }

        self.repo.save(tenant, &shift).await?;

        if shift.wave_of_driver(driver_id).is_none() {
            self.status_repo
                .save(tenant, driver_id, &StatusRecord::cleared())
                .await?;
            self.presence.forget_driver(tenant, driver_id).await;
        }

        Ok(shift)
    }

    // --- Leituras ---

    /// Ondas na ordem de exibição: primeiro as normais, depois as
    /// dedicadas, cada grupo na ordem original e cada onda com as vagas em
    /// ordem crescente. Não é uma ordenação global única: são dois baldes
    /// estáveis.
    pub async fn list_waves_for_display(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
    ) -> Result<Vec<Wave>, AppError> {
        let shift = self.load_existing(tenant, date, period).await?;
        let mut normal = Vec::new();
        let mut dedicated = Vec::new();
        for mut wave in shift.waves {
            wave.sort_slots();
            match wave.kind {
                WaveKind::Normal => normal.push(wave),
                WaveKind::Dedicated => dedicated.push(wave),
            }
        }
        normal.extend(dedicated);
        Ok(normal)
    }

    pub async fn get_shift(
        &self,
        tenant: &Uuid,
        date: NaiveDate,
        period: Period,
    ) -> Result<Option<Shift>, AppError> {
        self.repo.get(tenant, date, period).await
    }

    // --- Manutenção ---

    /// Reescreve o nome desnormalizado do motorista nas vagas dos turnos do
    /// dia, a partir do cadastro autoritativo.
    pub async fn reconcile_driver_name(
        &self,
        tenant: &Uuid,
        driver: &Driver,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        for period in [Period::Morning, Period::Afternoon] {
            let Some(mut shift) = self.repo.get(tenant, today, period).await? else {
                continue;
            };
            let mut touched = false;
            for wave in &mut shift.waves {
                for slot in &mut wave.slots {
                    if slot.driver_id == driver.id && slot.driver_name != driver.name {
                        slot.driver_name = driver.name.clone();
                        touched = true;
                    }
                }
            }
            if touched {
                self.repo.save(tenant, &shift).await?;
            }
        }
        Ok(())
    }

    /// Varredura diária: apaga turnos de datas passadas.
    pub async fn purge_stale(&self, tenant: &Uuid, today: NaiveDate) -> Result<usize, AppError> {
        self.repo.purge_stale(tenant, today).await
    }
}

/// Cascata de horários: a partir da onda `start` (que recebe `minutes`),
/// cada onda seguinte vale a anterior + 20 minutos, em cadeia. Se um
/// horário calculado alcançar 24:00, aquela onda e todas as seguintes ficam
/// sem horário; nunca dá a volta no relógio.
fn cascade_times(waves: &mut [Wave], start: usize, minutes: u32) {
    set_wave_minutes(&mut waves[start], Some(minutes));
    let mut current = minutes;
    let mut overflowed = false;
    for wave in waves.iter_mut().skip(start + 1) {
        if overflowed {
            set_wave_minutes(wave, None);
            continue;
        }
        current += WAVE_STEP_MINUTES;
        if current >= 24 * 60 {
            overflowed = true;
            set_wave_minutes(wave, None);
        } else {
            set_wave_minutes(wave, Some(current));
        }
    }
}

fn set_wave_minutes(wave: &mut Wave, minutes: Option<u32>) {
    wave.time = minutes.map(format_hhmm);
    // As vagas herdam o horário da onda; a cópia é rederivada aqui para não
    // ficar defasada depois de uma cascata.
    for slot in &mut wave.slots {
        slot.time = wave.time.clone();
    }
}

/// Números de vaga, quando atribuídos, são únicos dentro da onda.
fn check_vaga_free(wave: &Wave, vaga: &Option<String>, driver_id: &str) -> Result<(), AppError> {
    let Some(vaga) = vaga.as_deref().map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(());
    };
    let taken = wave
        .slots
        .iter()
        .any(|s| s.driver_id != driver_id && s.vaga.as_deref().map(str::trim) == Some(vaga));
    if taken {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "vaga",
            validator::ValidationError::new("vaga_ocupada")
                .with_message(format!("A vaga {vaga} já está ocupada nesta onda.").into()),
        );
        return Err(AppError::ValidationError(errors));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::remote::RemoteStore;
    use crate::models::driver::Role;

    fn services() -> (EscalaService, MemoryStore, Uuid) {
        let store = MemoryStore::new();
        let arc: Arc<dyn RemoteStore> = Arc::new(store.clone());
        let service = EscalaService::new(
            EscalaRepository::new(arc.clone()),
            StatusRepository::new(arc.clone()),
            DriverRepository::new(arc),
            PresenceMap::new(),
            Arc::new(Notify::new()),
        );
        (service, store, Uuid::new_v4())
    }

    fn hoje() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 29).unwrap()
    }

    async fn seed_driver(store: &MemoryStore, tenant: &Uuid, id: &str, name: &str) {
        let driver = Driver {
            id: id.to_string(),
            name: name.to_string(),
            phone: format!("219999{id}"),
            role: Role::Driver,
            active: true,
            modality: None,
        };
        store
            .set(
                &crate::db::remote::paths::driver(tenant, id),
                serde_json::to_value(&driver).unwrap(),
            )
            .await
            .unwrap();
    }

    async fn quatro_ondas(service: &EscalaService, tenant: &Uuid) {
        for _ in 0..4 {
            service
                .add_wave(tenant, hoje(), Period::Morning, None, WaveKind::Normal)
                .await
                .unwrap();
        }
    }

    fn horarios(shift: &Shift) -> Vec<Option<&str>> {
        shift.waves.iter().map(|w| w.time.as_deref()).collect()
    }

    #[tokio::test]
    async fn cascata_deriva_as_ondas_seguintes() {
        let (service, _store, tenant) = services();
        quatro_ondas(&service, &tenant).await;

        let shift = service
            .set_wave_time(&tenant, hoje(), Period::Morning, 0, "08:00")
            .await
            .unwrap();
        assert_eq!(
            horarios(&shift),
            vec![Some("08:00"), Some("08:20"), Some("08:40"), Some("09:00")]
        );

        // Editar a onda 1 rederiva só dali em diante; a onda 0 fica.
        let shift = service
            .set_wave_time(&tenant, hoje(), Period::Morning, 1, "09:00")
            .await
            .unwrap();
        assert_eq!(
            horarios(&shift),
            vec![Some("08:00"), Some("09:00"), Some("09:20"), Some("09:40")]
        );
    }

    #[tokio::test]
    async fn cascata_para_antes_da_meia_noite() {
        let (service, _store, tenant) = services();
        quatro_ondas(&service, &tenant).await;

        let shift = service
            .set_wave_time(&tenant, hoje(), Period::Morning, 0, "23:30")
            .await
            .unwrap();
        // 23:50 ainda vale; 00:10 estouraria o dia, então a onda 2 e as
        // seguintes ficam sem horário.
        assert_eq!(
            horarios(&shift),
            vec![Some("23:30"), Some("23:50"), None, None]
        );
    }

    #[tokio::test]
    async fn horario_invalido_rejeitado_sem_mutacao() {
        let (service, _store, tenant) = services();
        quatro_ondas(&service, &tenant).await;

        let err = service
            .set_wave_time(&tenant, hoje(), Period::Morning, 0, "8h30")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidTime(_)));

        let shift = service
            .get_shift(&tenant, hoje(), Period::Morning)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(horarios(&shift), vec![None, None, None, None]);
    }

    #[tokio::test]
    async fn motorista_em_duas_ondas_da_conflito_sem_mutacao() {
        let (service, store, tenant) = services();
        quatro_ondas(&service, &tenant).await;
        seed_driver(&store, &tenant, "d1", "João").await;

        service
            .assign_driver(
                &tenant,
                hoje(),
                Period::Morning,
                0,
                "d1",
                Some("01".into()),
                None,
                None,
            )
            .await
            .unwrap();

        let err = service
            .assign_driver(&tenant, hoje(), Period::Morning, 1, "d1", None, None, None)
            .await
            .unwrap_err();
        match err {
            AppError::DriverAlreadyScheduled { onda } => assert_eq!(onda, "Onda 1"),
            other => panic!("esperava conflito, veio {other:?}"),
        }

        // Nenhuma das duas ondas mudou.
        let shift = service
            .get_shift(&tenant, hoje(), Period::Morning)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shift.waves[0].slots.len(), 1);
        assert!(shift.waves[1].slots.is_empty());
    }

    #[tokio::test]
    async fn escalar_reseta_o_status_do_motorista() {
        let (service, store, tenant) = services();
        quatro_ondas(&service, &tenant).await;
        seed_driver(&store, &tenant, "d1", "João").await;

        service
            .assign_driver(&tenant, hoje(), Period::Morning, 0, "d1", None, None, None)
            .await
            .unwrap();

        let status = StatusRepository::new(Arc::new(store) as Arc<dyn RemoteStore>)
            .get(&tenant, "d1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.state, crate::models::status::DriverState::EnRoute);
        assert_eq!(status.message, crate::models::status::MSG_ESCALADO);
        assert!(status.vaga.is_none());
    }

    #[tokio::test]
    async fn remover_de_todas_as_ondas_limpa_o_status() {
        let (service, store, tenant) = services();
        quatro_ondas(&service, &tenant).await;
        seed_driver(&store, &tenant, "d1", "João").await;

        service
            .assign_driver(&tenant, hoje(), Period::Morning, 0, "d1", None, None, None)
            .await
            .unwrap();
        service
            .remove_driver(&tenant, hoje(), Period::Morning, 0, "d1")
            .await
            .unwrap();

        let status = StatusRepository::new(Arc::new(store) as Arc<dyn RemoteStore>)
            .get(&tenant, "d1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status.message, "");
    }

    #[tokio::test]
    async fn exibicao_em_dois_baldes_estaveis() {
        let (service, _store, tenant) = services();
        for (name, kind) in [
            ("Dedicada A", WaveKind::Dedicated),
            ("Onda 1", WaveKind::Normal),
            ("Dedicada B", WaveKind::Dedicated),
            ("Onda 2", WaveKind::Normal),
        ] {
            service
                .add_wave(
                    &tenant,
                    hoje(),
                    Period::Morning,
                    Some(name.to_string()),
                    kind,
                )
                .await
                .unwrap();
        }

        let waves = service
            .list_waves_for_display(&tenant, hoje(), Period::Morning)
            .await
            .unwrap();
        let names: Vec<&str> = waves.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["Onda 1", "Onda 2", "Dedicada A", "Dedicada B"]);
    }

    #[tokio::test]
    async fn falha_de_gravacao_preserva_o_snapshot() {
        let (service, store, tenant) = services();
        quatro_ondas(&service, &tenant).await;
        seed_driver(&store, &tenant, "d1", "João").await;

        // O retry interno faz até 3 tentativas; injetamos falhas
        // suficientes para esgotá-las.
        store.inject_write_failures(3);
        let err = service
            .assign_driver(&tenant, hoje(), Period::Morning, 0, "d1", None, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TransientStore(_)));

        // O turno confirmado continua sem o motorista e o status não foi
        // tocado.
        let shift = service
            .get_shift(&tenant, hoje(), Period::Morning)
            .await
            .unwrap()
            .unwrap();
        assert!(shift.waves[0].slots.is_empty());
        let status = StatusRepository::new(Arc::new(store) as Arc<dyn RemoteStore>)
            .get(&tenant, "d1")
            .await
            .unwrap();
        assert!(status.is_none());
    }

    #[tokio::test]
    async fn reconcilia_nome_desnormalizado() {
        let (service, store, tenant) = services();
        quatro_ondas(&service, &tenant).await;
        seed_driver(&store, &tenant, "d1", "João").await;
        service
            .assign_driver(&tenant, hoje(), Period::Morning, 0, "d1", None, None, None)
            .await
            .unwrap();

        let renamed = Driver {
            id: "d1".to_string(),
            name: "João Pedro".to_string(),
            phone: "21999990001".to_string(),
            role: Role::Driver,
            active: true,
            modality: None,
        };
        service
            .reconcile_driver_name(&tenant, &renamed, hoje())
            .await
            .unwrap();

        let shift = service
            .get_shift(&tenant, hoje(), Period::Morning)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shift.waves[0].slots[0].driver_name, "João Pedro");
    }
}
