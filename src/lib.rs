//! Domus is a chat assistant for tracking personal expenses.
//!
//! Users send short messages such as "mercado 150,00" to record an expense,
//! or commands such as "resumo" to get a summary of the month. Only users on
//! the access list are answered; a purchase webhook adds users to the list.
//!
//! This library provides the bot, the storage for its documents and the HTTP
//! server that receives the webhook.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

pub mod access;
mod app_state;
mod bot;
pub mod category;
pub mod chart;
pub mod command;
mod console;
mod currency;
mod endpoints;
pub mod expense;
pub mod ledger;
mod logging;
pub mod month;
pub mod report;
mod routing;
pub mod store;
mod timezone;
pub mod transport;
pub mod user;
pub mod webhook;

pub use app_state::{AppState, SharedStore};
pub use bot::Bot;
pub use chart::default_renderer;
pub use console::ConsoleTransport;
pub use logging::{LOG_BODY_LENGTH_LIMIT, REQUEST_BODY_LIMIT, logging_middleware};
pub use routing::build_router;
pub use store::{DocumentStore, JsonFileStore, MemoryStore};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("Could not listen for ctrl+c: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
            }
            Err(error) => {
                tracing::error!("Could not listen for the terminate signal: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A stored document exists but could not be parsed.
    ///
    /// The file is left untouched so that it can be repaired by hand.
    #[error("the document at {path} is corrupt: {reason}")]
    StorageCorrupt {
        /// Where the document is stored.
        path: String,
        /// What the parser reported.
        reason: String,
    },

    /// A document could not be read from or written to storage.
    #[error("storage error: {0}")]
    StorageIo(String),

    /// A thread panicked while holding a store's lock.
    #[error("could not acquire the store lock")]
    LockPoisoned,

    /// A webhook request carried a missing or wrong token.
    #[error("the webhook token is missing or invalid")]
    WebhookAuth,

    /// A webhook request was authorized but its body could not be used.
    #[error("{0}")]
    WebhookPayload(String),

    /// A chart or spreadsheet could not be produced.
    #[error("could not render attachment: {0}")]
    Render(String),

    /// The messaging transport failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::WebhookAuth => {
                (StatusCode::FORBIDDEN, "Acesso negado. Token inválido.").into_response()
            }
            Error::WebhookPayload(message) => (StatusCode::BAD_REQUEST, message).into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor.").into_response()
            }
        }
    }
}
