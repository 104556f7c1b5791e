// src/models.rs

pub mod availability;
pub mod driver;
pub mod escala;
pub mod geofence;
pub mod quinzena;
pub mod status;
pub mod tenancy;
