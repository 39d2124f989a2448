//! Server network layer: TCP accept loop and per-connection line handling

use crate::connections::Outbox;
use crate::dispatch::{Flow, GameContext};
use crate::lines::{LineEvent, LineReader};
use log::{debug, error, info, warn};
use shared::Command;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Lines longer than this are rejected without being parsed or buffered.
pub const MAX_LINE_LEN: usize = 512;

pub const WELCOME: &str = "Welcome to PokeCat! Type 'join <username>' to start or 'help' for commands.";

/// Accepts terminal connections and hands each one to its own task
pub struct Server {
    listener: TcpListener,
    ctx: GameContext,
    idle_timeout: Option<Duration>,
}

impl Server {
    pub async fn bind(
        addr: &str,
        ctx: GameContext,
        idle_timeout: Option<Duration>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(addr).await?;
        info!("Server listening on {}", listener.local_addr()?);
        Ok(Server {
            listener,
            ctx,
            idle_timeout,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Main accept loop. Only returns if the listener itself fails.
    pub async fn run(self) -> std::io::Result<()> {
        loop {
            let (mut stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!("Could not disable Nagle for {}: {}", addr, e);
            }

            let (outbox, outbox_rx) = mpsc::unbounded_channel();
            let conn_id = {
                let mut connections = self.ctx.connections.write().await;
                connections.add_connection(addr, outbox)
            };

            let Some(conn_id) = conn_id else {
                warn!("Rejecting {}: server full", addr);
                let _ = stream.write_all(b"Server full, try again later\n").await;
                continue;
            };

            let ctx = self.ctx.clone();
            let idle_timeout = self.idle_timeout;
            tokio::spawn(async move {
                serve_connection(stream, conn_id, outbox_rx, ctx, idle_timeout).await;
            });
        }
    }
}

/// Drives one connection until the peer quits, disconnects or idles out.
///
/// The connection must already be registered under `conn_id` with the sender
/// matching `outbox_rx`. Game state for the connection is cleaned up before
/// this returns.
pub async fn serve_connection<S>(
    stream: S,
    conn_id: u32,
    outbox_rx: mpsc::UnboundedReceiver<String>,
    ctx: GameContext,
    idle_timeout: Option<Duration>,
) where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (reader, writer) = tokio::io::split(stream);
    let writer_task = tokio::spawn(write_lines(writer, outbox_rx, conn_id));

    send(&ctx, conn_id, WELCOME).await;

    let mut lines = LineReader::new(BufReader::new(reader), MAX_LINE_LEN);
    loop {
        let next = match idle_timeout {
            Some(limit) => match timeout(limit, lines.read_line()).await {
                Ok(next) => next,
                Err(_) => {
                    info!("Connection {} idle for {:?}, closing", conn_id, limit);
                    send(&ctx, conn_id, "Disconnected for inactivity").await;
                    break;
                }
            },
            None => lines.read_line().await,
        };

        let line = match next {
            Ok(Some(LineEvent::Line(line))) => line,
            Ok(Some(LineEvent::TooLong)) => {
                send(&ctx, conn_id, "Line too long").await;
                continue;
            }
            Ok(Some(LineEvent::InvalidEncoding)) => {
                debug!("Connection {} sent a line that is not UTF-8", conn_id);
                send(&ctx, conn_id, "Invalid input encoding").await;
                continue;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Read error on connection {}: {}", conn_id, e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(command) => {
                debug!("Connection {}: {}", conn_id, command);
                if ctx.dispatch(conn_id, command).await == Flow::Quit {
                    break;
                }
            }
            Err(e) => send(&ctx, conn_id, e.to_string()).await,
        }
    }

    // Dropping the registry entry closes the outbox, which ends the writer
    // once everything queued has been flushed.
    ctx.disconnect(conn_id).await;
    if let Err(e) = writer_task.await {
        error!("Writer task for connection {} panicked: {}", conn_id, e);
    }
}

async fn write_lines<W>(mut writer: W, mut outbox_rx: mpsc::UnboundedReceiver<String>, conn_id: u32)
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = outbox_rx.recv().await {
        let result = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = result {
            debug!("Write to connection {} failed: {}", conn_id, e);
            break;
        }
    }
    let _ = writer.shutdown().await;
}

async fn send(ctx: &GameContext, conn_id: u32, line: impl Into<String>) {
    ctx.connections
        .read()
        .await
        .send_to_connection(conn_id, line);
}

/// Registers an in-process stream with the registry and serves it. Used by
/// tests that drive a connection without a socket.
pub async fn attach<S>(
    ctx: GameContext,
    stream: S,
    addr: SocketAddr,
    idle_timeout: Option<Duration>,
) -> Option<tokio::task::JoinHandle<()>>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (outbox, outbox_rx): (Outbox, _) = mpsc::unbounded_channel();
    let conn_id = ctx.connections.write().await.add_connection(addr, outbox)?;
    Some(tokio::spawn(serve_connection(
        stream,
        conn_id,
        outbox_rx,
        ctx,
        idle_timeout,
    )))
}
