//! The seam between the bot and the messaging network.
//!
//! The network client itself lives outside this crate. It is driven through the
//! [Transport] trait: connect, wait for the next [TransportEvent], send a
//! [Reply].

use std::{fmt::Display, future::Future};

use crate::{Error, user::UserId};

/// A message received from the messaging network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// A plain text message.
    Text {
        /// Who sent the message, as reported by the network.
        from: UserId,
        /// The message text, unmodified.
        body: String,
        /// Whether the message was sent from the bot's own account.
        from_me: bool,
    },
    /// Anything else (media, reactions, receipts), which the bot ignores.
    Unknown {
        /// Who sent the message, as reported by the network.
        from: UserId,
    },
}

/// Why the connection to the messaging network closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The account was logged out, so the session must be authenticated again.
    LoggedOut,
    /// The connection dropped for any other reason and can be reopened.
    ConnectionLost(String),
}

impl Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::LoggedOut => f.write_str("logged out"),
            DisconnectReason::ConnectionLost(reason) => write!(f, "connection lost: {reason}"),
        }
    }
}

/// Something that happened on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is open and messages will start arriving.
    Open,
    /// A message arrived.
    Message(InboundMessage),
    /// The connection closed.
    Closed(DisconnectReason),
}

/// A button offered in a [Reply::Menu].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuButton {
    /// The text the client sends back when the button is pressed.
    pub id: &'static str,
    /// The text shown on the button.
    pub label: &'static str,
}

/// A message the bot sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A plain text message.
    Text(String),
    /// An image with a caption.
    Image {
        /// The encoded image.
        bytes: Vec<u8>,
        /// The file name suggested for the image.
        file_name: String,
        /// Text shown under the image.
        caption: String,
    },
    /// A file attachment.
    Document {
        /// The file contents.
        bytes: Vec<u8>,
        /// The file name shown to the user.
        file_name: String,
        /// The MIME type of `bytes`.
        mime_type: &'static str,
    },
    /// A text with buttons the user can press instead of typing a command.
    Menu {
        /// The text shown above the buttons.
        text: String,
        /// The buttons, in display order.
        buttons: Vec<MenuButton>,
    },
}

/// A connection to the messaging network.
pub trait Transport {
    /// Open (or reopen) the connection.
    fn connect(&mut self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Wait for the next event on the connection.
    fn next_event(&mut self) -> impl Future<Output = Result<TransportEvent, Error>> + Send;

    /// Send `reply` to `to`.
    fn send(&mut self, to: &UserId, reply: Reply)
    -> impl Future<Output = Result<(), Error>> + Send;
}
