use std::io::Write;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{Result, WrapperError};

/// Where the assembled record goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sink {
    /// Dry run: print the record followed by a newline.
    Stdout,
    /// One unacknowledged datagram to the monitoring agent.
    Agent(SocketAddr),
}

pub async fn deliver(sink: Sink, payload: &[u8]) -> Result<()> {
    match sink {
        Sink::Stdout => {
            let stdout = std::io::stdout();
            write_line(&mut stdout.lock(), payload).map_err(WrapperError::Stdout)
        }
        Sink::Agent(addr) => send_datagram(addr, payload).await,
    }
}

fn write_line<W: Write>(out: &mut W, payload: &[u8]) -> std::io::Result<()> {
    out.write_all(payload)?;
    out.write_all(b"\n")?;
    out.flush()
}

async fn send_datagram(addr: SocketAddr, payload: &[u8]) -> Result<()> {
    let local: SocketAddr = if addr.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let fail = |reason: String| WrapperError::Delivery { addr, reason };

    let socket = UdpSocket::bind(local)
        .await
        .map_err(|e| fail(format!("bind failed: {e}")))?;
    socket
        .connect(addr)
        .await
        .map_err(|e| fail(format!("connect failed: {e}")))?;

    debug!(%addr, bytes = payload.len(), "sending check result");
    let sent = socket
        .send(payload)
        .await
        .map_err(|e| fail(format!("send failed: {e}")))?;
    if sent != payload.len() {
        return Err(fail(format!(
            "short write: {sent} of {} bytes",
            payload.len()
        )));
    }
    Ok(())
}
