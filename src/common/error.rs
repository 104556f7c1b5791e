// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// Nosso tipo de erro, com `thiserror` para melhor ergonomia.
//
// Política de propagação: toda entrada de mutação devolve Result com uma
// destas variantes em vez de dar panic. Erros inesperados são capturados na
// borda do componente e convertidos (TransientStore / ResourceNotFound).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Formato de horário fora do padrão HH:MM (ou campo obrigatório em branco).
    #[error("Horário inválido: {0}")]
    InvalidTime(String),

    // Cabeçalho obrigatório ausente ou malformado (x-tenant-id).
    #[error("Cabeçalho inválido: {0}")]
    BadHeader(String),

    // Conflito de escala: o motorista já está em outra onda do mesmo turno.
    // A mensagem carrega o nome da onda conflitante.
    #[error("Motorista já escalado na onda {onda}")]
    DriverAlreadyScheduled { onda: String },

    // Invariante de cadastro: um ativo por telefone normalizado na base.
    #[error("Já existe motorista ativo com o telefone {phone}")]
    DuplicatePhone { phone: String },

    // Ação de despacho incompatível com o estado corrente do motorista
    // (ex.: concluir quem não está carregando).
    #[error("Transição inválida a partir do estado {from}")]
    InvalidTransition { from: String },

    #[error("{0} não encontrado")]
    ResourceNotFound(String),

    // Indisponibilidade temporária do armazenamento remoto. Já passou pelo
    // retry com backoff; a projeção em memória do chamador continua válida.
    #[error("Falha temporária no armazenamento remoto: {0}")]
    TransientStore(String),

    // Falha de envio de push. Nunca é devolvida à ação que disparou a
    // notificação: vai para a fila de reenvio e é apenas logada.
    #[error("Falha na entrega de push: {0}")]
    Delivery(String),

    #[error("Token de autenticação inválido")]
    InvalidToken,

    #[error("Documento malformado no armazenamento")]
    MalformedDocument(#[from] serde_json::Error),

    // Variante genérica para qualquer outro erro inesperado.
    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            // Retorna todos os detalhes da validação.
            AppError::ValidationError(errors) => {
                let mut details = std::collections::HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                let body = Json(json!({
                    "error": "Um ou mais campos são inválidos.",
                    "details": details,
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidTime(ref detail) => {
                let body = Json(json!({ "error": format!("Horário inválido: {detail}") }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::DriverAlreadyScheduled { ref onda } => {
                let body =
                    Json(json!({ "error": format!("Motorista já escalado na onda {onda}.") }));
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::DuplicatePhone { ref phone } => {
                let body = Json(
                    json!({ "error": format!("Já existe motorista ativo com o telefone {phone}.") }),
                );
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::BadHeader(ref detail) => {
                let body = Json(json!({ "error": format!("Cabeçalho inválido: {detail}") }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::InvalidTransition { ref from } => {
                let body = Json(
                    json!({ "error": format!("Ação incompatível com o estado atual ({from}).") }),
                );
                return (StatusCode::CONFLICT, body).into_response();
            }
            AppError::ResourceNotFound(ref what) => {
                let body = Json(json!({ "error": format!("{what} não encontrado.") }));
                return (StatusCode::NOT_FOUND, body).into_response();
            }
            AppError::TransientStore(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Armazenamento temporariamente indisponível. Tente novamente.",
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "Token de autenticação inválido ou ausente.",
            ),

            // Delivery nunca deveria chegar aqui (fica na fila de reenvio),
            // mas se chegar, tratamos como os demais erros internos.
            ref e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Ocorreu um erro inesperado.",
                )
            }
        };

        // Resposta padrão para erros simples que só têm uma mensagem.
        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
