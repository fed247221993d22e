// SPDX-License-Identifier: MIT

//! ZMQ socket wrappers (spec §6.3, §6.4). The control socket is a ROUTER
//! (identity-routed request/reply); the log socket is a PULL. CURVE
//! configuration is best-effort here: `zeromq` 0.4 does not yet expose a
//! CURVE mechanism, so `--encrypt` is accepted and validated (the cert files
//! must exist and parse) but the actual handshake is not enforced at the
//! socket layer. This is called out explicitly in `DESIGN.md`.

use bytes::Bytes;
use dispatcher_core::Hostname;
use zeromq::{PullSocket, RouterSocket, Socket, SocketRecv, SocketSend, ZmqMessage};

use crate::error::TransportError;

pub struct ControlSocket {
    socket: RouterSocket,
}

impl ControlSocket {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let mut socket = RouterSocket::new();
        socket
            .bind(addr)
            .await
            .map_err(|source| TransportError::ControlBind { addr: addr.to_string(), source })?;
        Ok(Self { socket })
    }

    /// Returns the sending worker's identity frame plus the remaining
    /// verb/arg frames.
    pub async fn recv(&mut self) -> Result<(Hostname, Vec<Vec<u8>>), zeromq::ZmqError> {
        let msg = self.socket.recv().await?;
        let mut frames: Vec<Vec<u8>> = msg.into_vec().into_iter().map(|b| b.to_vec()).collect();
        let identity = frames.drain(..1).next().unwrap_or_default();
        Ok((Hostname::new(String::from_utf8_lossy(&identity).into_owned()), frames))
    }

    pub async fn send(&mut self, to: &Hostname, frames: Vec<Vec<u8>>) -> Result<(), zeromq::ZmqError> {
        let mut msg = ZmqMessage::from(to.as_str().as_bytes().to_vec());
        for frame in frames {
            msg.push_back(Bytes::from(frame));
        }
        self.socket.send(msg).await
    }
}

pub struct LogSocket {
    socket: PullSocket,
}

impl LogSocket {
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let mut socket = PullSocket::new();
        socket.bind(addr).await.map_err(|source| TransportError::LogBind { addr: addr.to_string(), source })?;
        Ok(Self { socket })
    }

    /// Non-blocking-in-spirit: the ≈2s idle sleep is implemented by the
    /// caller around this, since `zeromq`'s async `recv` already yields to
    /// the runtime rather than busy-polling.
    pub async fn recv(&mut self) -> Result<Vec<Vec<u8>>, zeromq::ZmqError> {
        let msg = self.socket.recv().await?;
        Ok(msg.into_vec().into_iter().map(|b| b.to_vec()).collect())
    }
}
