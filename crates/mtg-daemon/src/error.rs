//! HTTP mapping of engine failures.
//!
//! | Failure                                        | Status |
//! |------------------------------------------------|--------|
//! | invalid request / malformed body               | 400    |
//! | symbol, trade or order not found               | 404    |
//! | broker rejected / no result record             | 422    |
//! | terminal session cannot initialize             | 500    |
//! | other terminal call failure                    | 502    |
//! | no usable quote                                | 503    |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mtg_execution::GatewayError;

use crate::api_types::ErrorResponse;

#[derive(Debug)]
pub enum ApiError {
    Gateway(GatewayError),
    BadRequest(String),
    /// Daemon-side failure unrelated to the terminal (e.g. a worker panic).
    Internal(String),
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        ApiError::Gateway(e)
    }
}

pub fn status_for(err: &GatewayError) -> StatusCode {
    match err {
        GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        GatewayError::SymbolNotFound(_)
        | GatewayError::TradeNotFound(_)
        | GatewayError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        GatewayError::BrokerRejected { .. } | GatewayError::NoResult(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        GatewayError::BrokerUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        GatewayError::QuoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        GatewayError::Terminal(_) | GatewayError::SymbolSelectFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Gateway(e) => status_for(e),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(self) -> ErrorResponse {
        match self {
            ApiError::BadRequest(msg) => plain(msg, "invalid_request"),
            ApiError::Internal(msg) => plain(msg, "internal"),
            ApiError::Gateway(e) => {
                let mut body = plain(e.to_string(), e.kind());
                match e {
                    GatewayError::BrokerRejected {
                        retcode, result, ..
                    } => {
                        body.retcode = Some(retcode);
                        body.result = Some(*result);
                    }
                    GatewayError::BrokerUnavailable(t)
                    | GatewayError::NoResult(t)
                    | GatewayError::Terminal(t) => body.terminal_code = Some(t.code),
                    _ => {}
                }
                body
            }
        }
    }
}

fn plain(error: String, kind: &'static str) -> ErrorResponse {
    ErrorResponse {
        error,
        kind,
        retcode: None,
        result: None,
        terminal_code: None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(self.body())).into_response()
    }
}
