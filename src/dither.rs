//! Dither requests to an external guiding service.
//!
//! Protocol Overview:
//! - Transport: one TCP connection kept open for the whole run
//! - Request: exactly one command byte, selected by the dither amount
//! - Response: exactly one acknowledgment byte, value ignored
//! - Timing: strictly request-response, no timeout (the guider is trusted)
//!
//! The client is inert when dithering is disabled: no socket is created and
//! [`DitherClient::dither`] does nothing.

use crate::config::GuiderAddress;
use crate::error::{AppResult, DitherStage, SscError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Dither amount understood by the guiding service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DitherAmount {
    /// Smallest offset.
    One,
    /// Amount 2.
    Two,
    /// Amount 3.
    Three,
    /// Amount 4.
    Four,
    /// Largest offset.
    Five,
}

impl DitherAmount {
    /// Map a configured level to an amount. 0 disables dithering, above 5 is invalid.
    pub fn from_level(level: u8) -> AppResult<Option<Self>> {
        let amount = match level {
            0 => None,
            1 => Some(DitherAmount::One),
            2 => Some(DitherAmount::Two),
            3 => Some(DitherAmount::Three),
            4 => Some(DitherAmount::Four),
            5 => Some(DitherAmount::Five),
            other => {
                return Err(SscError::Configuration(format!(
                    "dither amount must be 0..=5, got {}",
                    other
                )))
            }
        };
        Ok(amount)
    }

    /// Numeric level 1..=5.
    pub fn level(self) -> u8 {
        match self {
            DitherAmount::One => 1,
            DitherAmount::Two => 2,
            DitherAmount::Three => 3,
            DitherAmount::Four => 4,
            DitherAmount::Five => 5,
        }
    }

    /// Command byte sent on the wire for this amount.
    pub fn command_byte(self) -> u8 {
        match self {
            DitherAmount::One => 3,
            DitherAmount::Two => 4,
            DitherAmount::Three => 5,
            DitherAmount::Four => 12,
            DitherAmount::Five => 13,
        }
    }
}

struct DitherSession {
    stream: TcpStream,
    amount: DitherAmount,
    addr: String,
}

/// Client issuing one dither command per exposure boundary.
pub struct DitherClient {
    session: Option<DitherSession>,
    requests: u32,
}

impl DitherClient {
    /// Client that never touches the network.
    pub fn disabled() -> Self {
        Self {
            session: None,
            requests: 0,
        }
    }

    /// Resolve and connect to the guiding service if an amount is configured.
    ///
    /// # Errors
    /// Returns [`SscError::Dither`] with [`DitherStage::Connect`] if the host cannot be
    /// resolved or the connection is refused.
    pub async fn connect(amount: Option<DitherAmount>, guider: &GuiderAddress) -> AppResult<Self> {
        let Some(amount) = amount else {
            return Ok(Self::disabled());
        };

        let addr = guider.to_string();
        let stream = TcpStream::connect((guider.host.as_str(), guider.port))
            .await
            .map_err(|source| SscError::Dither {
                stage: DitherStage::Connect,
                addr: addr.clone(),
                source,
            })?;

        // One-byte messages, do not let Nagle hold them back.
        stream.set_nodelay(true).map_err(|source| SscError::Dither {
            stage: DitherStage::Connect,
            addr: addr.clone(),
            source,
        })?;

        info!(%addr, amount = amount.level(), "Connected to guiding service");
        Ok(Self {
            session: Some(DitherSession {
                stream,
                amount,
                addr,
            }),
            requests: 0,
        })
    }

    /// Whether a guiding service connection exists.
    pub fn is_enabled(&self) -> bool {
        self.session.is_some()
    }

    /// Number of acknowledged dither requests so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Send one dither command and wait for its acknowledgment.
    pub async fn dither(&mut self) -> AppResult<()> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        let command = session.amount.command_byte();
        session
            .stream
            .write_all(&[command])
            .await
            .map_err(|source| SscError::Dither {
                stage: DitherStage::Send,
                addr: session.addr.clone(),
                source,
            })?;
        debug!(command, "Dither command sent");

        let mut ack = [0u8; 1];
        session
            .stream
            .read_exact(&mut ack)
            .await
            .map_err(|source| SscError::Dither {
                stage: DitherStage::Receive,
                addr: session.addr.clone(),
                source,
            })?;
        debug!(ack = ack[0], "Dither acknowledged");

        self.requests += 1;
        Ok(())
    }

    /// Close the connection. Closing a disabled or already closed client is a no-op.
    pub async fn disconnect(&mut self) {
        if let Some(mut session) = self.session.take() {
            // The guider has nothing left to tell us; a failed shutdown still closes on drop.
            let _ = session.stream.shutdown().await;
            debug!(addr = %session.addr, "Disconnected from guiding service");
        }
    }
}
