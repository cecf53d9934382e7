//! Live channel transport
//!
//! This module handles the persistent server connection including:
//! - The [`Connector`] / [`LiveChannel`] seam the session manager drives
//! - Subscribe/unsubscribe with at most one active event handler per channel
//! - Frames are not read until the first subscriber attaches
//! - [`TcpConnector`]: newline-delimited JSON frames over TCP
//!
//! Reconnection is not attempted here; a dropped connection surfaces as the
//! end of the subscribed event stream.

use crate::protocol::{self, InboundEvent, OutboundEvent};
use crate::{Error, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Time allowed for establishing the TCP connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Stream of inbound events delivered to the single active subscriber
pub type EventReceiver = mpsc::UnboundedReceiver<InboundEvent>;

/// Shared slot holding the active subscriber, if any
type HandlerSlot = Arc<Mutex<Option<mpsc::UnboundedSender<InboundEvent>>>>;

/// One open connection to the live event server
#[async_trait]
pub trait LiveChannel: Send {
    /// Write an outbound event
    async fn emit(&mut self, event: &OutboundEvent) -> Result<()>;

    /// Attach the event handler
    ///
    /// Fails if a handler is already attached.
    async fn subscribe(&mut self) -> Result<EventReceiver>;

    /// Detach the event handler; the receiver then yields `None`
    async fn unsubscribe(&mut self);

    /// Terminate the connection
    async fn close(&mut self) -> Result<()>;
}

/// Opens live channels
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish a new channel
    async fn connect(&self) -> Result<Box<dyn LiveChannel>>;
}

/// Connects to a newline-delimited JSON event server over TCP
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    /// Create a connector for `addr` (e.g. "127.0.0.1:7778")
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    /// Address connections are made to
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<Box<dyn LiveChannel>> {
        info!("Connecting live channel to {}", self.addr);

        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| Error::Transport(format!("Timed out connecting to {}", self.addr)))?
            .map_err(|e| Error::Transport(format!("Failed to connect to {}: {}", self.addr, e)))?;

        let channel = TcpChannel::from_stream(stream)?;
        Ok(Box::new(channel))
    }
}

/// [`LiveChannel`] over a TCP stream
pub struct TcpChannel {
    remote_addr: SocketAddr,
    writer: Option<OwnedWriteHalf>,
    /// Read half waiting for the first subscriber
    reader: Option<OwnedReadHalf>,
    handler: HandlerSlot,
    reader_task: Option<JoinHandle<()>>,
}

impl TcpChannel {
    /// Wrap a connected stream
    ///
    /// Reading starts with the first [`LiveChannel::subscribe`]; until then
    /// inbound frames wait in the socket buffer.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        let remote_addr = stream
            .peer_addr()
            .map_err(|e| Error::Transport(format!("Failed to get peer address: {}", e)))?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            remote_addr,
            writer: Some(write_half),
            reader: Some(read_half),
            handler: Arc::new(Mutex::new(None)),
            reader_task: None,
        })
    }

    /// Address of the server end
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

#[async_trait]
impl LiveChannel for TcpChannel {
    async fn emit(&mut self, event: &OutboundEvent) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| Error::Transport("Channel is closed".to_string()))?;

        let frame = protocol::encode_frame(event)?;
        writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| Error::Transport(format!("Failed to write to {}: {}", self.remote_addr, e)))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::Transport(format!("Failed to flush to {}: {}", self.remote_addr, e)))?;

        debug!("Emitted {:?} to {}", event, self.remote_addr);
        Ok(())
    }

    async fn subscribe(&mut self) -> Result<EventReceiver> {
        let mut guard = self.handler.lock().await;
        if guard.is_some() {
            return Err(Error::Transport("Channel already has a subscriber".to_string()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        *guard = Some(tx);
        drop(guard);

        if let Some(read_half) = self.reader.take() {
            debug!("Starting frame reader for {}", self.remote_addr);
            self.reader_task = Some(tokio::spawn(read_frames(
                read_half,
                self.handler.clone(),
                self.remote_addr,
            )));
        }
        Ok(rx)
    }

    async fn unsubscribe(&mut self) {
        self.handler.lock().await.take();
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
        self.reader.take();
        self.handler.lock().await.take();

        if let Some(mut writer) = self.writer.take() {
            writer
                .shutdown()
                .await
                .map_err(|e| Error::Transport(format!("Failed to shut down {}: {}", self.remote_addr, e)))?;
            info!("Live channel to {} closed", self.remote_addr);
        }
        Ok(())
    }
}

impl Drop for TcpChannel {
    fn drop(&mut self) {
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

/// Read frames until EOF, delivering each to the active subscriber
async fn read_frames(read_half: OwnedReadHalf, handler: HandlerSlot, remote_addr: SocketAddr) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                match protocol::decode_frame(&line) {
                    Ok(event) => {
                        let guard = handler.lock().await;
                        match guard.as_ref() {
                            Some(tx) => {
                                if tx.send(event).is_err() {
                                    debug!("Subscriber dropped, discarding event");
                                }
                            }
                            None => debug!("No subscriber attached, {} dropped", event.name()),
                        }
                    }
                    Err(e) => warn!("Skipping undecodable frame from {}: {}", remote_addr, e),
                }
            }
            Ok(None) => {
                info!("Live channel closed by {}", remote_addr);
                break;
            }
            Err(e) => {
                error!("Failed to read from {}: {}", remote_addr, e);
                break;
            }
        }
    }

    // Ends the subscriber's stream so the session sees the disconnect.
    handler.lock().await.take();
}
