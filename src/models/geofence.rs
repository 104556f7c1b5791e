// src/models/geofence.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

// Cerca circular: centro + raio em metros. Coordenadas zeradas significam
// zona não configurada pela base, que nunca dispara.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub center: GeoPoint,
    #[schema(example = 150.0)]
    pub radius_m: f64,
}

impl Zone {
    pub fn is_configured(&self) -> bool {
        (self.center.lat != 0.0 || self.center.lon != 0.0) && self.radius_m > 0.0
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.is_configured() && haversine_m(&self.center, point) <= self.radius_m
    }
}

// Configuração de zonas de uma base. As duas são opcionais.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YardZones {
    pub yard: Option<Zone>,
    pub parking: Option<Zone>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ZoneKind {
    Yard,
    Parking,
}

/// Distância haversine em metros entre dois pontos.
pub fn haversine_m(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}
