//! The chat bot: reads messages from a [Transport], checks the sender against
//! the access list and answers commands.

use std::time::Duration;

use time::Date;

use crate::{
    AppState, Error,
    access::is_authorized,
    chart::ChartRenderer,
    command::{Command, CommandContext, execute},
    timezone::today,
    transport::{DisconnectReason, InboundMessage, Reply, Transport, TransportEvent},
    user::UserId,
};

/// How long to wait before reopening a dropped connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Sent when a command fails for reasons the user cannot fix.
const INTERNAL_ERROR_REPLY: &str =
    "Desculpe, algo deu errado ao processar sua mensagem. Tente novamente mais tarde.";

/// The chat bot.
pub struct Bot {
    state: AppState,
    charts: Box<dyn ChartRenderer>,
}

impl Bot {
    /// Create a bot that uses the stores in `state` and renders charts with `charts`.
    pub fn new(state: AppState, charts: Box<dyn ChartRenderer>) -> Self {
        Self { state, charts }
    }

    /// Serve messages from `transport` until the account is logged out.
    ///
    /// A connection that closes for any other reason is reopened.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot connect or fails while waiting
    /// for events.
    pub async fn run<T: Transport>(&self, transport: &mut T) -> Result<(), Error> {
        loop {
            transport.connect().await?;

            match self.serve(transport).await? {
                DisconnectReason::LoggedOut => {
                    tracing::error!("Logged out of the messaging network, authenticate again to continue.");
                    return Ok(());
                }
                reason => {
                    tracing::warn!("Connection closed ({reason}), reconnecting...");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }

    async fn serve<T: Transport>(&self, transport: &mut T) -> Result<DisconnectReason, Error> {
        loop {
            match transport.next_event().await? {
                TransportEvent::Open => tracing::info!("Connection to the messaging network is open."),
                TransportEvent::Closed(reason) => return Ok(reason),
                TransportEvent::Message(message) => {
                    let today = today(&self.state.local_timezone)?;

                    let Some((to, reply)) = self.handle_message(&message, today) else {
                        continue;
                    };

                    if let Err(error) = transport.send(&to, reply).await {
                        tracing::error!("Could not send reply to {to}: {error}");
                    }
                }
            }
        }
    }

    /// Decide how to answer `message`, received on `today`.
    ///
    /// Returns the recipient and the reply, or `None` if the message should go
    /// unanswered: it is not text, was sent by the bot itself, or comes from a
    /// user who is not on the access list.
    pub fn handle_message(&self, message: &InboundMessage, today: Date) -> Option<(UserId, Reply)> {
        let (from, body) = match message {
            InboundMessage::Text { from_me: true, .. } => return None,
            InboundMessage::Text { from, body, .. } => (from, body),
            InboundMessage::Unknown { from } => {
                tracing::debug!("Ignoring a non-text message from {from}");
                return None;
            }
        };

        let user = UserId::normalized(from.as_str());

        match self.is_authorized(&user) {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("Ignoring a message from {user}, who is not on the access list");
                return None;
            }
            Err(error) => {
                tracing::error!("Could not check whether {user} may use the bot: {error}");
                return None;
            }
        }

        let reply = match self.run_command(&Command::parse(body), &user, today) {
            Ok(reply) => reply,
            Err(error) => {
                tracing::error!("Could not handle message from {user}: {error}");
                Reply::Text(INTERNAL_ERROR_REPLY.to_owned())
            }
        };

        Some((from.clone(), reply))
    }

    fn is_authorized(&self, user: &UserId) -> Result<bool, Error> {
        let access_list = self
            .state
            .access_list
            .lock()
            .map_err(|_| Error::LockPoisoned)?;

        is_authorized(&*access_list, user)
    }

    fn run_command(&self, command: &Command, user: &UserId, today: Date) -> Result<Reply, Error> {
        let ledger = self.state.ledger.lock().map_err(|_| Error::LockPoisoned)?;

        let context = CommandContext {
            user,
            today,
            ledger: &*ledger,
            charts: self.charts.as_ref(),
        };

        execute(command, &context)
    }
}
