// src/main.rs

use std::time::Duration;

use axum::{
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod push;
mod services;

use crate::config::AppState;
use crate::models::tenancy::TenantApproval;

// Cadência da varredura de manutenção (turnos de datas passadas).
const MAINTENANCE_PERIOD: Duration = Duration::from_secs(6 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let app_state = AppState::new()
        .await
        .expect("Falha ao inicializar o estado da aplicação.");

    // --- Tarefas de fundo ---
    let cancel = CancellationToken::new();
    let geofence = app_state.geofence_service.clone();
    tokio::spawn(geofence.run(cancel.child_token()));
    let notifier = app_state.notification_service.clone();
    tokio::spawn(notifier.run_retry_worker(cancel.child_token()));
    tokio::spawn(run_maintenance(app_state.clone(), cancel.child_token()));

    // --- Rotas ---
    let escala_routes = Router::new()
        .route("/", get(handlers::escala::get_shift))
        .route("/display", get(handlers::escala::list_display))
        .route("/waves", post(handlers::escala::add_wave))
        .route("/waves/{wave_index}/time", put(handlers::escala::set_wave_time))
        .route(
            "/waves/{wave_index}/slots",
            post(handlers::escala::assign_driver),
        )
        .route(
            "/waves/{wave_index}/slots/{driver_id}",
            axum::routing::patch(handlers::escala::update_slot)
                .delete(handlers::escala::remove_driver),
        );

    let operations_routes = Router::new()
        .route("/notify-scheduled", post(handlers::operations::notify_scheduled))
        .route("/{driver_id}/call", post(handlers::operations::call_to_slot))
        .route(
            "/{driver_id}/call-to-parking",
            post(handlers::operations::call_to_parking),
        )
        .route("/{driver_id}/complete", post(handlers::operations::mark_complete))
        .route("/{driver_id}/reset", post(handlers::operations::reset_status));

    let status_routes = Router::new()
        .route("/me", get(handlers::status::get_my_status))
        .route("/me/ack", post(handlers::status::acknowledge))
        .route("/me/location", post(handlers::status::report_location))
        .route("/me/complete", post(handlers::status::complete_my_loading))
        .route(
            "/{driver_id}/quinzena/{month}/{year}",
            get(handlers::status::get_quinzena),
        );

    let availability_routes = Router::new()
        .route("/", get(handlers::availability::get_poll))
        .route("/respond", post(handlers::availability::respond));

    let driver_routes = Router::new()
        .route(
            "/",
            post(handlers::drivers::upsert_driver).get(handlers::drivers::list_drivers),
        )
        .route("/{driver_id}", get(handlers::drivers::get_driver));

    let tenancy_routes = Router::new()
        .route(
            "/",
            post(handlers::tenancy::register_tenant).get(handlers::tenancy::list_tenants),
        )
        .route("/{id}/approve", post(handlers::tenancy::approve_tenant))
        .route("/{id}/reject", post(handlers::tenancy::reject_tenant))
        .route(
            "/zones",
            get(handlers::tenancy::get_zones).put(handlers::tenancy::set_zones),
        );

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/escala", escala_routes)
        .nest("/api/operations", operations_routes)
        .nest("/api/status", status_routes)
        .nest("/api/availability", availability_routes)
        .nest("/api/drivers", driver_routes)
        .nest("/api/tenants", tenancy_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .with_state(app_state);

    // --- Servidor ---
    let addr = "0.0.0.0:3000";
    let listener = TcpListener::bind(addr)
        .await
        .expect("Falha ao iniciar o listener TCP");
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr().unwrap());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .expect("Erro no servidor Axum");
}

async fn shutdown_signal(cancel: CancellationToken) {
    tokio::signal::ctrl_c()
        .await
        .expect("Falha ao instalar o handler de Ctrl+C");
    tracing::info!("Sinal de encerramento recebido");
    cancel.cancel();
}

/// Varredura periódica: apaga turnos de datas passadas de todas as bases
/// ativas. Erros são logados e a varredura continua na próxima rodada.
async fn run_maintenance(app_state: AppState, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(MAINTENANCE_PERIOD);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let today = Utc::now().date_naive();
        let tenants = match app_state.tenancy_service.list().await {
            Ok(tenants) => tenants,
            Err(e) => {
                tracing::error!("Varredura de manutenção não listou as bases: {}", e);
                continue;
            }
        };
        for tenant in tenants {
            if tenant.approval != TenantApproval::Active {
                continue;
            }
            match app_state.escala_service.purge_stale(&tenant.id, today).await {
                Ok(0) => {}
                Ok(purged) => {
                    tracing::info!("Varredura removeu {} turnos antigos da base {}", purged, tenant.id);
                }
                Err(e) => {
                    tracing::error!("Varredura da base {} falhou: {}", tenant.id, e);
                }
            }
        }
    }
}
