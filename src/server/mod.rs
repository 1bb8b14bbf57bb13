//! HTTP/2 server
//!
//! A [`Server`] accepts TCP connections, terminates TLS on them, negotiates
//! HTTP/2 and hands every stream to a [`Service`]. The service routes
//! `/api` to the benchmark orchestrator and everything else to the static
//! file tree.
//!
//! [`serve_connection`] runs the HTTP/2 part alone on any transport, which
//! is how the server is driven in tests.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, info_span, Instrument};

pub use self::service::Service;
pub use crate::proto::h2::server::serve_connection;

use self::tcp::Incoming;
use crate::config::Config;
use crate::proto::h2::server::{handshake, serve};

mod files;
mod service;
mod tcp;
mod tls;

/// A bound HTTPS listener.
#[derive(Debug)]
pub struct Server {
    incoming: Incoming,
    conn: Connecting,
}

#[derive(Clone)]
struct Connecting {
    tls: TlsAcceptor,
    builder: h2::server::Builder,
    service: Service,
    handshake_timeout: Duration,
}

impl Server {
    /// Binds the listener and prepares TLS according to `config`.
    pub fn bind(config: &Config) -> crate::Result<Server> {
        let tls = tls::acceptor(config)?;

        let mut incoming = Incoming::bind(&config.listen)?;
        incoming.set_keepalive(config.tcp_keepalive);

        let mut builder = h2::server::Builder::new();
        if let Some(max) = config.max_concurrent_streams {
            builder.max_concurrent_streams(max);
        }

        let service = Service::new(&config.static_dir)
            .compress(config.compress)
            .push_capacity(config.push_capacity)
            .idle_timeout(Some(config.idle_timeout).filter(|idle| !idle.is_zero()));

        Ok(Server {
            incoming,
            conn: Connecting {
                tls,
                builder,
                service,
                handshake_timeout: config.handshake_timeout,
            },
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.incoming.local_addr()
    }

    /// Accepts connections until the listener fails.
    pub async fn run(mut self) -> crate::Result<()> {
        info!("listening on https://{}", self.local_addr());
        loop {
            let (socket, remote_addr) = self.incoming.accept().await?;
            let span = info_span!("conn", remote = %remote_addr);
            tokio::spawn(self.conn.clone().serve(socket).instrument(span));
        }
    }
}

impl Connecting {
    async fn serve(self, socket: TcpStream) {
        let timeout = self.handshake_timeout;
        let handshakes = async {
            let stream = self.tls.accept(socket).await.map_err(crate::Error::new_tls)?;
            let alpn = stream
                .get_ref()
                .1
                .alpn_protocol()
                .map(|proto| String::from_utf8_lossy(proto).into_owned());
            debug!(?alpn, "tls handshake complete");
            handshake(stream, &self.builder).await
        };

        let conn = match tokio::time::timeout(timeout, handshakes).await {
            Ok(Ok(conn)) => conn,
            Ok(Err(err)) => {
                debug!("handshake failed: {}", err);
                return;
            }
            Err(_) => {
                debug!("handshake timed out after {:?}", timeout);
                return;
            }
        };

        if let Err(err) = serve(conn, self.service).await {
            debug!("connection error: {}", err);
        }
    }
}

impl std::fmt::Debug for Connecting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connecting")
            .field("service", &self.service)
            .field("handshake_timeout", &self.handshake_timeout)
            .finish()
    }
}
