// src/handlers.rs

pub mod availability;
pub mod drivers;
pub mod escala;
pub mod operations;
pub mod status;
pub mod tenancy;
