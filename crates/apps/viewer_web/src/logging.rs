use std::sync::Once;

/// Library crates log lifecycle at `debug`; keep wgpu's own chatter down.
pub const DEFAULT_LOG_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

static INIT: Once = Once::new();

/// Installs the global subscriber. Safe to call on every mount.
pub fn setup_logging() {
    INIT.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        setup_web_logging();
        #[cfg(not(target_arch = "wasm32"))]
        setup_native_logging();
    });
}

#[cfg(target_arch = "wasm32")]
fn setup_web_logging() {
    use tracing_subscriber::layer::SubscriberExt as _;
    tracing::subscriber::set_global_default(
        tracing_subscriber::Registry::default()
            .with(tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
            .with(tracing_wasm::WASMLayer::new(
                tracing_wasm::WASMLayerConfig::default(),
            )),
    )
    .expect("Failed to set tracing subscriber.");
}

#[cfg(not(target_arch = "wasm32"))]
fn setup_native_logging() {
    // Another subscriber may already be installed by a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::setup_logging;

    #[test]
    fn setup_is_idempotent() {
        setup_logging();
        setup_logging();
        tracing::info!("logging ready");
    }
}
