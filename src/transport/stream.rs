use crate::protocol::codec::{decode_message, encode_message};
use crate::transport::error::{Result, TransportError};
use crate::transport::{MessageHandler, Transport};
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Newline-delimited JSON transport over a reader/writer pair
///
/// Messages are handled strictly one at a time, so responses leave in the
/// order requests arrived.
pub struct StreamTransport<R, W> {
    reader: Mutex<Option<R>>,
    writer: Arc<Mutex<W>>,
    task: Option<JoinHandle<()>>,
    handler: Option<Arc<dyn MessageHandler>>,
    closed: Arc<AtomicBool>,
}

impl StreamTransport<Stdin, Stdout> {
    /// Transport bound to the process stdin/stdout
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            writer: Arc::new(Mutex::new(writer)),
            task: None,
            handler: None,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// Fire `on_close` at most once per session
fn notify_closed(handler: &dyn MessageHandler, closed: &AtomicBool) {
    if !closed.swap(true, Ordering::SeqCst) {
        handler.on_close();
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &Mutex<W>, message: &Value) -> Result<()> {
    let line = encode_message(message)?;
    let mut writer = writer.lock().await;
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| TransportError::WriteError(e.to_string()))?;
    writer
        .flush()
        .await
        .map_err(|e| TransportError::WriteError(e.to_string()))
}

async fn read_loop<R, W>(
    reader: R,
    writer: Arc<Mutex<W>>,
    handler: Arc<dyn MessageHandler>,
    closed: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }

                let message = match decode_message(&line) {
                    Ok(message) => message,
                    Err(e) => {
                        handler.on_error(&TransportError::Malformed(e));
                        continue;
                    }
                };

                debug!(bytes = line.len(), "received message");

                if let Some(response) = handler.on_message(message).await
                    && let Err(e) = write_line(&writer, &response).await
                {
                    handler.on_error(&e);
                }
            }
            Ok(None) => {
                info!("end of input, closing stream session");
                break;
            }
            // Non UTF-8 line: the bytes were consumed, keep reading
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                handler.on_error(&TransportError::ReadError(e.to_string()));
            }
            Err(e) => {
                handler.on_error(&TransportError::ReadError(e.to_string()));
                break;
            }
        }
    }

    notify_closed(handler.as_ref(), &closed);
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn start(&mut self, handler: Arc<dyn MessageHandler>) -> Result<()> {
        let reader = self
            .reader
            .get_mut()
            .take()
            .ok_or(TransportError::AlreadyStarted)?;

        let task = tokio::spawn(read_loop(
            reader,
            self.writer.clone(),
            handler.clone(),
            self.closed.clone(),
        ));

        self.task = Some(task);
        self.handler = Some(handler);
        info!("stream transport started");
        Ok(())
    }

    async fn send(&self, message: &Value) -> Result<()> {
        write_line(&self.writer, message).await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }

        if let Some(handler) = self.handler.as_ref() {
            notify_closed(handler.as_ref(), &self.closed);
        }

        let mut writer = self.writer.lock().await;
        writer
            .flush()
            .await
            .map_err(|e| TransportError::WriteError(e.to_string()))
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.as_mut() {
            let _ = task.await;
            self.task = None;
        }
    }
}
