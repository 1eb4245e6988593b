//! Internal module for establishing TLS connections to IMAP servers.

use crate::error::{Error, Result};
use rustls::ClientConfig;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, instrument};
use webpki_roots::TLS_SERVER_ROOTS;

/// A TLS stream over TCP, used for IMAP communication.
pub(crate) type TlsStream = tokio_rustls::client::TlsStream<TcpStream>;

/// Opens a TCP connection to `target_addr` and performs the TLS handshake
/// for `imap_host`.
#[instrument(
    name = "connection::establish_tls",
    skip_all,
    fields(imap_host = %imap_host, target_addr = %target_addr)
)]
pub(crate) async fn establish_tls_connection(imap_host: &str, target_addr: &str) -> Result<TlsStream> {
    let server_name = parse_server_name(imap_host)?;

    let tcp_stream = TcpStream::connect(target_addr)
        .await
        .map_err(|source| Error::TcpConnect {
            target: target_addr.to_string(),
            source,
        })?;

    debug!("Performing TLS handshake");

    tls_connector()
        .connect(server_name, tcp_stream)
        .await
        .map_err(|source| Error::TlsConnect {
            target: target_addr.to_string(),
            source,
        })
}

/// Builds a connector trusting the Mozilla root set.
fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.add_trust_anchors(TLS_SERVER_ROOTS.iter().map(|ta| {
        rustls::OwnedTrustAnchor::from_subject_spki_name_constraints(
            ta.subject,
            ta.spki,
            ta.name_constraints,
        )
    }));

    let config = ClientConfig::builder()
        .with_safe_defaults()
        .with_root_certificates(roots)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Parses server name for TLS SNI.
fn parse_server_name(host: &str) -> Result<rustls::ServerName> {
    rustls::ServerName::try_from(host).map_err(|source| Error::InvalidDnsName {
        host: host.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_server_names() {
        assert!(parse_server_name("outlook.office365.com").is_ok());
        assert!(parse_server_name("").is_err());
        assert!(parse_server_name("not a host").is_err());
    }

    #[tokio::test]
    async fn test_connect_refused_is_retryable() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = establish_tls_connection("localhost", &addr).await.unwrap_err();
        assert!(matches!(err, Error::TcpConnect { .. }));
        assert!(err.is_retryable());
    }
}
