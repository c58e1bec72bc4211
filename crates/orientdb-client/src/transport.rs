//! The TCP/TLS stream a session actor reads and writes (§6 TLS).

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use orientdb_core::config::ConnectionConfig;

use crate::error::ClientError;

/// Either a plain TCP stream or a TLS-wrapped one. The handshake byte
/// layout is identical over both — only the bytes underneath differ.
pub enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "tls")]
    Tls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
}

impl Stream {
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, ClientError> {
        let addr = format!("{}:{}", config.host, config.port);
        let connect = TcpStream::connect(&addr);
        let tcp = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| ClientError::Timeout)?
            .map_err(ClientError::TransportFailure)?;

        if !config.tls {
            return Ok(Stream::Plain(tcp));
        }

        #[cfg(feature = "tls")]
        {
            let tls_connector = default_tls_connector();
            let server_name = rustls::pki_types::ServerName::try_from(config.host.clone())
                .map_err(|e| ClientError::ProtocolError(format!("invalid TLS server name: {e}")))?;
            let tls = tls_connector
                .connect(server_name, tcp)
                .await
                .map_err(ClientError::TransportFailure)?;
            return Ok(Stream::Tls(Box::new(tls)));
        }

        #[cfg(not(feature = "tls"))]
        {
            Err(ClientError::ProtocolError("TLS requested but the \"tls\" feature is not enabled".into()))
        }
    }

    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf).await,
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.read(buf).await,
        }
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Stream::Plain(s) => s.write_all(buf).await,
            #[cfg(feature = "tls")]
            Stream::Tls(s) => s.write_all(buf).await,
        }
    }
}

#[cfg(feature = "tls")]
fn default_tls_connector() -> tokio_rustls::TlsConnector {
    let mut root_store = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    let (added, _ignored) = root_store.add_parsable_certificates(native.certs);
    tracing::debug!(added, load_errors = native.errors.len(), "loaded native TLS root certificates");
    let config = rustls::ClientConfig::builder().with_root_certificates(root_store).with_no_client_auth();
    tokio_rustls::TlsConnector::from(std::sync::Arc::new(config))
}

/// Builds a connector trusting only the caller-supplied certificates —
/// used against self-signed test servers instead of the native root store.
#[cfg(feature = "tls")]
pub fn tls_connector_with_roots(roots: Vec<rustls::pki_types::CertificateDer<'static>>) -> tokio_rustls::TlsConnector {
    let mut root_store = rustls::RootCertStore::empty();
    let (_added, _ignored) = root_store.add_parsable_certificates(roots);
    let config = rustls::ClientConfig::builder().with_root_certificates(root_store).with_no_client_auth();
    tokio_rustls::TlsConnector::from(std::sync::Arc::new(config))
}
