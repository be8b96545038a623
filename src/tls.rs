use std::sync::Arc;

use rustls::{Certificate, ClientConfig, RootCertStore};
use tracing::warn;

/// Client config trusting the platform's native roots.
pub(crate) fn client_config() -> Arc<ClientConfig> {
    let mut roots = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            for cert in certs {
                if let Err(err) = roots.add(&Certificate(cert.0)) {
                    warn!(error = %err, "skipping unusable native certificate");
                }
            }
        }
        Err(err) => warn!(error = %err, "could not load native root certificates"),
    }

    Arc::new(
        ClientConfig::builder()
            .with_safe_defaults()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}
