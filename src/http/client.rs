use std::{fs::File, io, path::Path};

use bytes::Bytes;
use http_body_util::Full;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use rustls_pki_types::CertificateDer;

pub type HttpsClient = hyper_util::client::legacy::Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

#[derive(Clone, Default, Debug)]
pub struct Builder {
    client_builder: Option<hyper_util::client::legacy::Builder>,
    certs: Option<Vec<CertificateDer<'static>>>,
    enable_tcp_nodelay: bool,
}

impl Builder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            enable_tcp_nodelay: true,
            ..Default::default()
        }
    }

    /// Trust these certificates on top of the platform roots.
    pub fn with_custom_certs(self, certs: Option<Vec<CertificateDer<'static>>>) -> Self {
        Self { certs, ..self }
    }

    /// Override the Hyper client [`Builder`](hyper_util::client::legacy::Builder) used to construct this client.
    pub fn with_hyper_builder(self, client_builder: hyper_util::client::legacy::Builder) -> Self {
        Self {
            client_builder: Some(client_builder),
            ..self
        }
    }

    /// Configure `SO_NODELAY` for all sockets.
    pub fn enable_tcp_nodelay(self, nodelay: bool) -> Self {
        Self {
            enable_tcp_nodelay: nodelay,
            ..self
        }
    }

    /// Create an HTTPS client trusting the native roots plus any custom certs.
    /// Plain `http://` URLs are allowed as well.
    pub fn build_https(self) -> Result<HttpsClient, rustls::Error> {
        let mut roots = rustls::RootCertStore::empty();
        let root_certs = rustls_native_certs::load_native_certs();
        for err in &root_certs.errors {
            tracing::debug!(target: "relaylog", "skipping native certificate: {}", err);
        }
        roots.add_parsable_certificates(root_certs.certs);

        if let Some(certs) = self.certs {
            roots.add_parsable_certificates(certs);
        }

        let tls_config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::aws_lc_rs::default_provider().into(),
        )
        .with_safe_default_protocol_versions()?
        .with_root_certificates(roots)
        .with_no_client_auth();

        let mut http_connector = HttpConnector::new();
        http_connector.set_nodelay(self.enable_tcp_nodelay);
        http_connector.enforce_http(false);

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(tls_config)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .wrap_connector(http_connector);

        let client_builder = self
            .client_builder
            .unwrap_or_else(|| hyper_util::client::legacy::Builder::new(TokioExecutor::new()));

        Ok(client_builder.build(connector))
    }
}

/// Reads every certificate from a PEM bundle.
pub fn load_certificates_from_pem(path: &Path) -> io::Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)?;
    let mut reader = io::BufReader::new(file);

    rustls_pemfile::certs(&mut reader).collect()
}
