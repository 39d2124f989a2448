//! Client network loop: relays typed commands to the server and prints replies

use crate::input::{help_text, interpret, Input};
use log::{debug, info};
use shared::Command;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Connection to a PokeCat server over any line-oriented stream
pub struct Client<S> {
    stream: S,
    username: Option<String>,
}

impl Client<TcpStream> {
    pub async fn connect(addr: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected to {}", addr);
        Ok(Client::new(stream))
    }
}

impl<S> Client<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            username: None,
        }
    }

    /// Sends `join <username>` as soon as the session starts.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Runs until the server closes the connection or `input` reaches EOF.
    ///
    /// Server lines are copied to `output` as they arrive; local help and
    /// parse errors are written there too.
    pub async fn run<I, O>(self, input: I, mut output: O) -> Result<(), Box<dyn std::error::Error>>
    where
        I: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let (reader, mut writer) = tokio::io::split(self.stream);
        let mut server_lines = BufReader::new(reader).lines();
        let mut user_lines = input.lines();
        let mut input_open = true;

        if let Some(username) = &self.username {
            let join = Command::Join {
                username: username.clone(),
            };
            send_command(&mut writer, &join).await?;
        }

        loop {
            tokio::select! {
                line = server_lines.next_line() => {
                    match line? {
                        Some(line) => {
                            output.write_all(line.as_bytes()).await?;
                            output.write_all(b"\n").await?;
                            output.flush().await?;
                        }
                        None => {
                            info!("Server closed the connection");
                            break;
                        }
                    }
                }
                line = user_lines.next_line(), if input_open => {
                    let Some(line) = line? else {
                        // Keep printing until the server acknowledges the quit
                        debug!("Input closed, sending quit");
                        send_command(&mut writer, &Command::Quit).await?;
                        input_open = false;
                        continue;
                    };
                    match interpret(&line) {
                        Input::Send(command) => {
                            send_command(&mut writer, &command).await?;
                            if command == Command::Quit {
                                input_open = false;
                            }
                        }
                        Input::Help => output.write_all(help_text().as_bytes()).await?,
                        Input::Invalid(e) => {
                            output.write_all(format!("{}\n", e).as_bytes()).await?;
                        }
                        Input::Empty => {}
                    }
                    output.flush().await?;
                }
            }
        }

        Ok(())
    }
}

async fn send_command<W>(writer: &mut W, command: &Command) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    debug!("Sending '{}'", command);
    writer.write_all(format!("{}\n", command).as_bytes()).await?;
    writer.flush().await
}
