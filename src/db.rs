// src/db.rs

pub mod memory;
pub mod remote;

pub mod availability_repo;
pub use availability_repo::AvailabilityRepository;
pub mod driver_repo;
pub use driver_repo::DriverRepository;
pub mod escala_repo;
pub use escala_repo::EscalaRepository;
pub mod quinzena_repo;
pub use quinzena_repo::QuinzenaRepository;
pub mod status_repo;
pub use status_repo::StatusRepository;
pub mod tenancy_repo;
pub use tenancy_repo::TenantRepository;
