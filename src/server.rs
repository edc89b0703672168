//! Accepts TCP connections and runs the per-connection request/response
//! loop concurrently. One task per connection; each task owns its
//! socket exclusively (spec §5).

use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{lookup_host, TcpSocket, TcpStream};

use crate::config::Config;
use crate::dispatch::handle_request;
use crate::metadata::ClusterMetadata;

pub async fn run(config: Config, metadata: Arc<ClusterMetadata>) -> Result<()> {
    let bind_addr = config.bind_addr();
    // `bind_addr` is a host:port pair (default host is "localhost", per
    // spec), so it needs real resolution — SocketAddr's FromStr only
    // accepts IP literals and would reject the default configuration.
    let addr = lookup_host(&bind_addr)
        .await
        .with_context(|| format!("resolve bind address '{bind_addr}'"))?
        .next()
        .with_context(|| format!("no addresses resolved for '{bind_addr}'"))?;

    let socket = if addr.is_ipv6() {
        TcpSocket::new_v6()
    } else {
        TcpSocket::new_v4()
    }
    .context("create listen socket")?;
    socket.set_reuseport(true).context("set SO_REUSEPORT")?;
    socket.bind(addr).with_context(|| format!("bind {addr}"))?;
    let listener = socket.listen(1024).context("listen")?;

    tracing::info!(%addr, "listening");

    let log_dir = Arc::new(config.log_dir.clone());

    loop {
        let (stream, peer) = listener.accept().await.context("accept connection")?;
        let metadata = Arc::clone(&metadata);
        let log_dir = Arc::clone(&log_dir);

        tokio::spawn(async move {
            tracing::debug!(%peer, "accepted connection");
            if let Err(e) = handle_connection(stream, &metadata, &log_dir).await {
                tracing::warn!(%peer, error = %e, "closing connection after error");
            }
        });
    }
}

/// Requests on a connection are processed strictly in order — request
/// n's response is written before request n+1 is read. No pipelining.
async fn handle_connection(
    mut stream: TcpStream,
    metadata: &ClusterMetadata,
    log_dir: &std::path::Path,
) -> Result<()> {
    loop {
        let mut len_buf = [0u8; 4];
        match stream.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e).context("read message length"),
        }
        let msg_len = i32::from_be_bytes(len_buf) as usize;

        let mut msg = BytesMut::with_capacity(msg_len);
        msg.resize(msg_len, 0);
        stream
            .read_exact(&mut msg)
            .await
            .context("read message body")?;

        let response = handle_request(msg.freeze(), metadata, log_dir)
            .context("process request")?;

        stream
            .write_all(&response)
            .await
            .context("write response")?;
        stream.flush().await.context("flush response")?;
    }
}
