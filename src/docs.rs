// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Escala ---
        handlers::escala::add_wave,
        handlers::escala::set_wave_time,
        handlers::escala::assign_driver,
        handlers::escala::update_slot,
        handlers::escala::remove_driver,
        handlers::escala::list_display,
        handlers::escala::get_shift,

        // --- Operações ---
        handlers::operations::call_to_slot,
        handlers::operations::call_to_parking,
        handlers::operations::mark_complete,
        handlers::operations::reset_status,
        handlers::operations::notify_scheduled,

        // --- Status ---
        handlers::status::get_my_status,
        handlers::status::acknowledge,
        handlers::status::report_location,
        handlers::status::complete_my_loading,
        handlers::status::get_quinzena,

        // --- Disponibilidade ---
        handlers::availability::get_poll,
        handlers::availability::respond,

        // --- Motoristas ---
        handlers::drivers::upsert_driver,
        handlers::drivers::list_drivers,
        handlers::drivers::get_driver,

        // --- Bases ---
        handlers::tenancy::register_tenant,
        handlers::tenancy::list_tenants,
        handlers::tenancy::approve_tenant,
        handlers::tenancy::reject_tenant,
        handlers::tenancy::get_zones,
        handlers::tenancy::set_zones,
    ),
    components(
        schemas(
            // --- Escala ---
            models::escala::Period,
            models::escala::WaveKind,
            models::escala::WaveSlot,
            models::escala::Wave,
            models::escala::Shift,

            // --- Status ---
            models::status::DriverState,
            models::status::StatusRecord,

            // --- Motoristas ---
            models::driver::Role,
            models::driver::Driver,

            // --- Disponibilidade ---
            models::availability::PollEntry,
            models::availability::AvailabilityPoll,

            // --- Quinzena ---
            models::quinzena::Quinzena,

            // --- Geofence ---
            models::geofence::GeoPoint,
            models::geofence::Zone,
            models::geofence::YardZones,

            // --- Bases ---
            models::tenancy::TenantApproval,
            models::tenancy::Tenant,

            // --- Payloads ---
            handlers::escala::AddWavePayload,
            handlers::escala::SetWaveTimePayload,
            handlers::escala::AssignDriverPayload,
            handlers::escala::UpdateSlotPayload,
            handlers::operations::CallToSlotPayload,
            handlers::operations::NotifyScheduledPayload,
            handlers::status::LocationPayload,
            handlers::availability::RespondPayload,
            handlers::drivers::UpsertDriverPayload,
            handlers::tenancy::RegisterTenantPayload,
        )
    ),
    tags(
        (name = "Escala", description = "Montagem de ondas e vagas do turno"),
        (name = "Operações", description = "Chamadas, conclusão e reset do ciclo do motorista"),
        (name = "Status", description = "Rotas do aplicativo do motorista"),
        (name = "Disponibilidade", description = "Lista de disponibilidade do dia seguinte"),
        (name = "Motoristas", description = "Cadastro de motoristas da base"),
        (name = "Bases", description = "Registro, aprovação e zonas de geofence das bases")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
