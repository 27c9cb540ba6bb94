//! A [Transport] over a terminal, for running the bot locally.
//!
//! Every input line is a text message from one fixed user. Replies are printed;
//! attachments are written to an outbox directory and their paths printed.
//! End of input reads as a logout, which stops the bot.

use std::path::PathBuf;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout};

use crate::{
    Error,
    transport::{DisconnectReason, InboundMessage, Reply, Transport, TransportEvent},
    user::UserId,
};

/// A transport reading messages from `R` and writing replies to `W`.
pub struct ConsoleTransport<R, W> {
    user: UserId,
    lines: Lines<R>,
    output: W,
    outbox: PathBuf,
    opening: bool,
}

impl ConsoleTransport<BufReader<Stdin>, Stdout> {
    /// A transport on the process's standard input and output.
    pub fn stdio(user: UserId, outbox: impl Into<PathBuf>) -> Self {
        Self::new(user, BufReader::new(tokio::io::stdin()), tokio::io::stdout(), outbox)
    }
}

impl<R, W> ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// A transport where every line of `input` is a message from `user`.
    pub fn new(user: UserId, input: R, output: W, outbox: impl Into<PathBuf>) -> Self {
        Self {
            user,
            lines: input.lines(),
            output,
            outbox: outbox.into(),
            opening: false,
        }
    }

    async fn write(&mut self, text: &str) -> Result<(), Error> {
        self.output
            .write_all(format!("{text}\n").as_bytes())
            .await
            .and(self.output.flush().await)
            .map_err(|error| Error::Transport(format!("could not write to console: {error}")))
    }

    async fn save_attachment(&mut self, file_name: &str, bytes: &[u8]) -> Result<PathBuf, Error> {
        tokio::fs::create_dir_all(&self.outbox)
            .await
            .map_err(|error| Error::Transport(format!("could not create outbox: {error}")))?;

        // Only the final component, so a file name cannot escape the outbox.
        let file_name = std::path::Path::new(file_name)
            .file_name()
            .map(|name| name.to_owned())
            .unwrap_or_else(|| "anexo".into());
        let path = self.outbox.join(file_name);

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|error| Error::Transport(format!("could not write {}: {error}", path.display())))?;

        Ok(path)
    }
}

impl<R, W> Transport for ConsoleTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn connect(&mut self) -> Result<(), Error> {
        self.opening = true;
        Ok(())
    }

    async fn next_event(&mut self) -> Result<TransportEvent, Error> {
        if self.opening {
            self.opening = false;
            return Ok(TransportEvent::Open);
        }

        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|error| Error::Transport(format!("could not read from console: {error}")))?;

            match line {
                None => return Ok(TransportEvent::Closed(DisconnectReason::LoggedOut)),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => {
                    return Ok(TransportEvent::Message(InboundMessage::Text {
                        from: self.user.clone(),
                        body: line,
                        from_me: false,
                    }));
                }
            }
        }
    }

    async fn send(&mut self, to: &UserId, reply: Reply) -> Result<(), Error> {
        tracing::debug!("Sending reply to {to}");

        match reply {
            Reply::Text(text) => self.write(&text).await,
            Reply::Image {
                bytes,
                file_name,
                caption,
            } => {
                let path = self.save_attachment(&file_name, &bytes).await?;
                self.write(&format!("[imagem] {}\n{caption}", path.display())).await
            }
            Reply::Document {
                bytes, file_name, ..
            } => {
                let path = self.save_attachment(&file_name, &bytes).await?;
                self.write(&format!("[documento] {}", path.display())).await
            }
            Reply::Menu { text, buttons } => {
                let mut menu = text;
                for button in buttons {
                    menu.push_str(&format!("\n[{}] {}", button.id, button.label));
                }
                self.write(&menu).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        command::MENU_BUTTONS,
        report::SPREADSHEET_MIME_TYPE,
        transport::{DisconnectReason, InboundMessage, Reply, Transport, TransportEvent},
        user::UserId,
    };

    use super::ConsoleTransport;

    fn user() -> UserId {
        UserId::new("5511912345678@s.whatsapp.net")
    }

    #[tokio::test]
    async fn lines_become_messages_until_end_of_input() {
        let input: &[u8] = b"cafezinho 7,50\n\n  \nresumo\n";
        let outbox = tempfile::tempdir().unwrap();
        let mut transport = ConsoleTransport::new(user(), input, Vec::new(), outbox.path());

        transport.connect().await.unwrap();

        assert_eq!(transport.next_event().await.unwrap(), TransportEvent::Open);
        assert_eq!(
            transport.next_event().await.unwrap(),
            TransportEvent::Message(InboundMessage::Text {
                from: user(),
                body: "cafezinho 7,50".to_owned(),
                from_me: false,
            })
        );
        assert!(matches!(
            transport.next_event().await.unwrap(),
            TransportEvent::Message(InboundMessage::Text { ref body, .. }) if body == "resumo"
        ));
        assert_eq!(
            transport.next_event().await.unwrap(),
            TransportEvent::Closed(DisconnectReason::LoggedOut)
        );
    }

    #[tokio::test]
    async fn prints_text_and_menus() {
        let outbox = tempfile::tempdir().unwrap();
        let mut transport = ConsoleTransport::new(user(), &b""[..], Vec::new(), outbox.path());

        transport
            .send(&user(), Reply::Text("Número inválido.".to_owned()))
            .await
            .unwrap();
        transport
            .send(
                &user(),
                Reply::Menu {
                    text: "Menu".to_owned(),
                    buttons: MENU_BUTTONS.to_vec(),
                },
            )
            .await
            .unwrap();

        let printed = String::from_utf8(transport.output).unwrap();
        assert!(printed.starts_with("Número inválido.\nMenu\n[resumo] "), "{printed}");
        assert!(printed.contains("[ajuda] "), "{printed}");
    }

    #[tokio::test]
    async fn writes_attachments_to_outbox() {
        let outbox = tempfile::tempdir().unwrap();
        let mut transport = ConsoleTransport::new(user(), &b""[..], Vec::new(), outbox.path());

        transport
            .send(
                &user(),
                Reply::Document {
                    bytes: b"PK\x03\x04".to_vec(),
                    file_name: "../5511912345678-2025-10.xlsx".to_owned(),
                    mime_type: SPREADSHEET_MIME_TYPE,
                },
            )
            .await
            .unwrap();

        let saved = std::fs::read(outbox.path().join("5511912345678-2025-10.xlsx")).unwrap();
        assert_eq!(saved, b"PK\x03\x04");
        let printed = String::from_utf8(transport.output).unwrap();
        assert!(printed.starts_with("[documento] "), "{printed}");
    }
}
