// src/middleware/auth.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::{common::error::AppError, config::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    // Id do sujeito (motorista ou despachante, conforme o papel).
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

// Principal autenticado extraído do Bearer token. O núcleo nunca lida com
// autenticação: aqui é a borda, e quem chega nos serviços já chega
// identificado.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub role: String,
}

impl Principal {
    pub fn is_superadmin(&self) -> bool {
        self.role == "superadmin"
    }

    pub fn is_dispatcher(&self) -> bool {
        self.role == "admin" || self.is_superadmin()
    }
}

impl FromRequestParts<AppState> for Principal {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get("Authorization")
            .and_then(|value| value.to_str().ok())
            .ok_or(AppError::InvalidToken)?;
        let token = header.strip_prefix("Bearer ").ok_or(AppError::InvalidToken)?;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|_| AppError::InvalidToken)?;

        Ok(Principal {
            id: data.claims.sub,
            role: data.claims.role,
        })
    }
}

/// Guarda das rotas de administração do pátio (despachante ou superadmin).
pub fn require_dispatcher(principal: &Principal) -> Result<(), AppError> {
    if principal.is_dispatcher() {
        Ok(())
    } else {
        Err(AppError::InvalidToken)
    }
}

/// Guarda das rotas de governança de bases.
pub fn require_superadmin(principal: &Principal) -> Result<(), AppError> {
    if principal.is_superadmin() {
        Ok(())
    } else {
        Err(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn papel_de_despachante_inclui_superadmin() {
        let admin = Principal {
            id: "u1".into(),
            role: "admin".into(),
        };
        let superadmin = Principal {
            id: "u2".into(),
            role: "superadmin".into(),
        };
        let driver = Principal {
            id: "u3".into(),
            role: "driver".into(),
        };
        assert!(require_dispatcher(&admin).is_ok());
        assert!(require_dispatcher(&superadmin).is_ok());
        assert!(require_dispatcher(&driver).is_err());
        assert!(require_superadmin(&admin).is_err());
    }
}
