// src/services.rs

pub mod availability_service;
pub use availability_service::AvailabilityService;
pub mod dispatch_service;
pub use dispatch_service::DispatchService;
pub mod escala_service;
pub use escala_service::EscalaService;
pub mod geofence_service;
pub use geofence_service::{GeofenceService, PresenceMap};
pub mod notification_service;
pub use notification_service::NotificationService;
pub mod quinzena_service;
pub use quinzena_service::QuinzenaService;
pub mod tenancy_service;
pub use tenancy_service::TenancyService;
