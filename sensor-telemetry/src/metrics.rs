use std::net::{IpAddr, Ipv6Addr, SocketAddr};
use std::sync::{Mutex, PoisonError};

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

// Only one global recorder can be installed per process, so the handle is cached for callers
// that ask for it more than once. `OnceLock::get_or_try_init` is still unstable.
static PROMETHEUS_HANDLE: Mutex<Option<PrometheusHandle>> = Mutex::new(None);

/// Initializes metrics with an automatic HTTP server on `port`.
///
/// Installs a global metrics recorder and starts an HTTP server that listens on
/// `[::]:{port}/metrics`, making metrics available for Prometheus scraping. Outside of a
/// tokio runtime the exporter gets its own background thread.
pub fn init_metrics(port: u16, app_name: &str) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port))
        .add_global_label("app", app_name)
        .install()?;

    Ok(())
}

/// Installs a global recorder without an HTTP listener and returns a handle for rendering.
///
/// Later calls return clones of the cached handle.
pub fn init_metrics_handle() -> Result<PrometheusHandle, BuildError> {
    let mut cached = PROMETHEUS_HANDLE
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(handle) = &*cached {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    *cached = Some(handle.clone());

    Ok(handle)
}
