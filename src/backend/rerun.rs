//! Rerun backend adapter
//!
//! Frames records onto a TCP connection to a Rerun proxy endpoint. Each
//! frame carries a kind tag, the record sequence number, and the encoded
//! payload, so the server side can account for every record it receives.
//! The full Rerun SDK client is an external collaborator; this adapter
//! only implements the narrow wire surface the harness needs.

use std::time::Duration;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;

use super::{BackendAdapter, SendError, SendResult};
use crate::gen::Payload;
use crate::sched::Record;
use crate::{LogBenchError, Result};

/// Default bound on a single send before it is recorded as a timeout
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

const TAG_POINTS3D: u8 = 1;
const TAG_IMAGE: u8 = 2;
const TAG_TEXT: u8 = 3;
const TAG_MESH: u8 = 4;

/// Rerun adapter over a framed TCP connection
#[derive(Debug)]
pub struct RerunAdapter {
    stream: Option<BufWriter<TcpStream>>,
    send_timeout: Duration,
}

impl RerunAdapter {
    /// Create a disconnected adapter with the default send timeout
    pub fn new() -> Self {
        Self {
            stream: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Set the bound on a single send operation
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}

impl Default for RerunAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BackendAdapter for RerunAdapter {
    fn name(&self) -> &'static str {
        "rerun"
    }

    async fn connect(&mut self, endpoint: &str) -> Result<()> {
        let stream = TcpStream::connect(endpoint).await.map_err(|e| {
            LogBenchError::ConnectionError(format!("failed to connect to {}: {}", endpoint, e))
        })?;
        stream.set_nodelay(true).map_err(|e| {
            LogBenchError::ConnectionError(format!("failed to configure socket: {}", e))
        })?;
        self.stream = Some(BufWriter::new(stream));
        Ok(())
    }

    async fn send(&mut self, record: &Record) -> SendResult {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| SendError::transport("not connected"))?;

        let frame = encode_frame(record);
        match tokio::time::timeout(self.send_timeout, stream.write_all(&frame)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SendError::transport(e.to_string())),
            Err(_) => Err(SendError::timeout(format!(
                "send exceeded {:?}",
                self.send_timeout
            ))),
        }
    }

    async fn flush(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.as_mut() {
            stream.flush().await?;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        // Taking the stream makes a second disconnect a no-op.
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.flush().await;
            let _ = stream.get_mut().shutdown().await;
        }
        Ok(())
    }
}

/// Encode one record as a wire frame: tag, sequence number, body length, body
pub fn encode_frame(record: &Record) -> Vec<u8> {
    let body = encode_payload(&record.payload);

    let mut frame = Vec::with_capacity(1 + 8 + 4 + body.len());
    frame.push(kind_tag(&record.payload));
    frame.extend_from_slice(&record.seq.to_le_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(&body);
    frame
}

fn kind_tag(payload: &Payload) -> u8 {
    match payload {
        Payload::Points3d { .. } => TAG_POINTS3D,
        Payload::Image { .. } => TAG_IMAGE,
        Payload::Text(_) => TAG_TEXT,
        Payload::Mesh { .. } => TAG_MESH,
    }
}

fn encode_payload(payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Points3d { positions, colors } => {
            let mut buf = Vec::with_capacity(4 + positions.len() * 15);
            buf.extend_from_slice(&(positions.len() as u32).to_le_bytes());
            for p in positions {
                for c in p {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            for c in colors {
                buf.extend_from_slice(c);
            }
            buf
        }
        Payload::Image {
            width,
            height,
            pixels,
        } => {
            let mut buf = Vec::with_capacity(8 + pixels.len());
            buf.extend_from_slice(&width.to_le_bytes());
            buf.extend_from_slice(&height.to_le_bytes());
            buf.extend_from_slice(pixels);
            buf
        }
        Payload::Text(text) => text.as_bytes().to_vec(),
        Payload::Mesh {
            vertices,
            triangles,
            colors,
        } => {
            let mut buf =
                Vec::with_capacity(8 + vertices.len() * 15 + triangles.len() * 12);
            buf.extend_from_slice(&(vertices.len() as u32).to_le_bytes());
            buf.extend_from_slice(&(triangles.len() as u32).to_le_bytes());
            for v in vertices {
                for c in v {
                    buf.extend_from_slice(&c.to_le_bytes());
                }
            }
            for t in triangles {
                for idx in t {
                    buf.extend_from_slice(&idx.to_le_bytes());
                }
            }
            for c in colors {
                buf.extend_from_slice(c);
            }
            buf
        }
    }
}
