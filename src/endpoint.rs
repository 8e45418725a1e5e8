use std::sync::Arc;

use log::{debug, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, ring, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream};

use crate::config::EndpointConfig;

/// Binance USD-M futures best bid/offer stream for BTCUSDT.
pub const DEFAULT_URL: &str = "wss://fstream.binance.com/ws/btcusdt@bookTicker";

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens one WebSocket connection to the configured feed.
///
/// No subscription message is sent: the stream name is part of
/// the URL and the feed starts pushing immediately.
///
/// Failures are returned as-is. There is no retry.
pub async fn connect(cfg: &EndpointConfig) -> anyhow::Result<WsStream> {
    let connector = if cfg.insecure_tls {
        warn!("TLS certificate verification disabled for {}", cfg.url);
        Some(insecure_connector()?)
    } else {
        None
    };

    let (ws, response) = connect_async_tls_with_config(cfg.url.as_str(), None, true, connector)
        .await
        .map_err(|e| anyhow::anyhow!("connect to {} failed: {}", cfg.url, e))?;

    debug!("connected to {} (HTTP {})", cfg.url, response.status());

    Ok(ws)
}

/// rustls connector that accepts any server certificate.
///
/// Handshake signatures are still checked, so the session is
/// encrypted to whoever presented the certificate.
pub fn insecure_connector() -> anyhow::Result<Connector> {
    let config = ClientConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyCertificate::new()))
        .with_no_client_auth();

    Ok(Connector::Rustls(Arc::new(config)))
}

#[derive(Debug)]
struct AcceptAnyCertificate(CryptoProvider);

impl AcceptAnyCertificate {
    fn new() -> Self {
        Self(ring::default_provider())
    }
}

impl ServerCertVerifier for AcceptAnyCertificate {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.0.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_accepts_any_certificate() {
        let verifier = AcceptAnyCertificate::new();
        let cert = CertificateDer::from(vec![0u8; 16]);
        let name = ServerName::try_from("fstream.binance.com").unwrap();

        assert!(verifier
            .verify_server_cert(&cert, &[], &name, &[], UnixTime::now())
            .is_ok());
        assert!(!verifier.supported_verify_schemes().is_empty());
    }

    #[test]
    fn insecure_connector_uses_rustls() {
        assert!(matches!(insecure_connector().unwrap(), Connector::Rustls(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let cfg = EndpointConfig {
            url: "ws://127.0.0.1:1/ws".to_string(),
            insecure_tls: false,
        };

        let err = connect(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
