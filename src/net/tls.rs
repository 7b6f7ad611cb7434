//! TLS client transport
//!
//! Both stream directions connect as TLS clients with mandatory hostname
//! verification and peer-certificate validation against a trust anchor,
//! either the bundled webpki roots or an explicitly configured CA file.
//! There is no lower-security mode.
//!
//! The connection is synchronous (`rustls::StreamOwned` over a blocking
//! `TcpStream`) because each session runs on a dedicated worker thread.

use std::fs::File;
use std::io::BufReader;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, RootCertStore, StreamOwned};

use crate::config::StreamConfig;
use crate::constants::CONNECT_TIMEOUT;
use crate::error::TransportError;

/// Established TLS stream plus the raw socket kept for shutdown
pub struct TlsStream {
    /// Blocking TLS stream the worker reads from / writes to
    pub stream: StreamOwned<ClientConnection, TcpStream>,
    /// Clone of the underlying socket; `shutdown` on this from the stopping
    /// side forces a blocked read/write in the worker to return promptly
    pub socket: TcpStream,
}

/// TLS connector for one configured endpoint
pub struct TlsClient {
    host: String,
    port: u16,
    config: Arc<ClientConfig>,
}

impl TlsClient {
    /// Build a connector from the stream configuration
    pub fn new(config: &StreamConfig) -> Result<Self, TransportError> {
        // Install the process-wide crypto provider once; subsequent calls
        // return Err and are ignored.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let roots = match &config.ca_cert {
            Some(path) => load_ca_file(path)?,
            None => bundled_roots(),
        };

        let tls_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            host: config.host.clone(),
            port: config.port,
            config: Arc::new(tls_config),
        })
    }

    /// Connect to the configured endpoint with hostname verification
    ///
    /// Connection establishment is bounded by [`CONNECT_TIMEOUT`]; the
    /// steady-state read/write path is not.
    pub fn connect(&self) -> Result<TlsStream, TransportError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| TransportError::InvalidAddress(format!("{}:{}: {}", self.host, self.port, e)))?
            .next()
            .ok_or_else(|| {
                TransportError::InvalidAddress(format!("{}:{}", self.host, self.port))
            })?;

        let socket = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| TransportError::ConnectFailed(format!("{}: {}", addr, e)))?;
        let socket_clone = socket
            .try_clone()
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;

        let server_name = ServerName::try_from(self.host.clone())
            .map_err(|e| TransportError::InvalidAddress(format!("{}: {}", self.host, e)))?;
        let connection = ClientConnection::new(self.config.clone(), server_name)
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        Ok(TlsStream {
            stream: StreamOwned::new(connection, socket),
            socket: socket_clone,
        })
    }
}

/// Root store from the bundled webpki roots
fn bundled_roots() -> RootCertStore {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    roots
}

/// Root store from a PEM certificate bundle on disk
fn load_ca_file(path: &Path) -> Result<RootCertStore, TransportError> {
    let file = File::open(path)
        .map_err(|e| TransportError::TrustAnchor(format!("{}: {}", path.display(), e)))?;
    let mut reader = BufReader::new(file);

    let mut roots = RootCertStore::empty();
    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut reader) {
        let cert = cert.map_err(|e| TransportError::TrustAnchor(e.to_string()))?;
        roots
            .add(cert)
            .map_err(|e| TransportError::TrustAnchor(e.to_string()))?;
        added += 1;
    }

    if added == 0 {
        return Err(TransportError::TrustAnchor(format!(
            "no certificates in {}",
            path.display()
        )));
    }

    Ok(roots)
}
