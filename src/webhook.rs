//! The webhook that grants access to the bot when a purchase is confirmed.
//!
//! The sales platform posts a JSON event to [endpoints::WEBHOOK](crate::endpoints::WEBHOOK)
//! with the shared secret in a header. Purchase confirmations add the buyer's
//! phone number to the access list; every other event is acknowledged and
//! ignored.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{FromRef, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::{
    AppState, Error,
    access::{AccessList, grant_access},
    app_state::SharedStore,
    store::DocumentStore,
    user::UserId,
};

/// The event type sent when a purchase has been paid for.
pub const PURCHASE_CONFIRMED_EVENT: &str = "Purchase_Order_Confirmed";

/// The header carrying the shared secret. `Authorization` is accepted too.
pub const WEBHOOK_TOKEN_HEADER: &str = "x-webhook-token";

/// The state needed for receiving webhook events.
#[derive(Clone)]
pub struct WebhookState {
    /// The users allowed to talk to the bot.
    pub access_list: SharedStore<AccessList>,
    /// The shared secret callers must present.
    pub webhook_token: Arc<str>,
}

impl FromRef<AppState> for WebhookState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            access_list: state.access_list.clone(),
            webhook_token: state.webhook_token.clone(),
        }
    }
}

/// What happened to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantOutcome {
    /// The event was not a purchase confirmation.
    Ignored,
    /// The buyer was added to the access list.
    Granted(UserId),
    /// The buyer already had access.
    AlreadyGranted(UserId),
}

/// Grant access to the buyer of a confirmed purchase.
///
/// Events of any type other than [PURCHASE_CONFIRMED_EVENT] are ignored.
///
/// # Errors
///
/// Returns an [Error::WebhookPayload] if a purchase confirmation has no buyer
/// phone number, or a storage error if the access list could not be updated.
pub fn receive_access_grant(
    event: &Value,
    access_list: &dyn DocumentStore<AccessList>,
) -> Result<GrantOutcome, Error> {
    if event.get("Event").and_then(Value::as_str) != Some(PURCHASE_CONFIRMED_EVENT) {
        return Ok(GrantOutcome::Ignored);
    }

    let user = event
        .pointer("/Data/Buyer/PhoneNumber")
        .and_then(Value::as_str)
        .and_then(UserId::from_phone_number)
        .ok_or_else(|| {
            Error::WebhookPayload("Número de telefone não encontrado no payload.".to_owned())
        })?;

    if grant_access(access_list, user.clone())? {
        Ok(GrantOutcome::Granted(user))
    } else {
        Ok(GrantOutcome::AlreadyGranted(user))
    }
}

/// Handle an event posted by the sales platform.
///
/// Responds with 403 if the shared secret is wrong or missing, 400 if the body
/// is not JSON or a purchase confirmation has no phone number, and 200
/// otherwise.
pub async fn webhook_endpoint(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let token = headers
        .get(WEBHOOK_TOKEN_HEADER)
        .or_else(|| headers.get(AUTHORIZATION))
        .and_then(|value| value.to_str().ok());

    if token != Some(state.webhook_token.as_ref()) {
        match token {
            Some(token) => tracing::warn!(
                "rejected webhook with an invalid token ({} characters)",
                token.len()
            ),
            None => tracing::warn!("rejected webhook without a token"),
        }
        return Error::WebhookAuth.into_response();
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            return Error::WebhookPayload(format!("O corpo da requisição não é JSON: {error}"))
                .into_response();
        }
    };

    let access_list = match state.access_list.lock() {
        Ok(access_list) => access_list,
        Err(error) => {
            tracing::error!("could not acquire the access list lock: {error}");
            return Error::LockPoisoned.into_response();
        }
    };

    match receive_access_grant(&event, &*access_list) {
        Ok(GrantOutcome::Ignored) => (
            StatusCode::OK,
            "Evento ignorado, não é uma confirmação de compra.",
        )
            .into_response(),
        Ok(GrantOutcome::Granted(user)) => {
            tracing::info!("granted access to {user}");
            (StatusCode::OK, "Webhook recebido e processado com sucesso!").into_response()
        }
        Ok(GrantOutcome::AlreadyGranted(user)) => {
            tracing::info!("{user} already has access");
            (StatusCode::OK, "Webhook recebido e processado com sucesso!").into_response()
        }
        Err(error) => {
            tracing::warn!("could not process webhook event: {error}");
            error.into_response()
        }
    }
}
