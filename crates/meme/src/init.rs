//! Process-wide setup.

/// Sets up logging through `env_logger` (controlled by `RUST_LOG`).
///
/// Safe to call more than once; later calls do nothing.
pub fn init() {
    if env_logger::try_init().is_ok() {
        log::info!("meme-rs {} initialized", env!("CARGO_PKG_VERSION"));
    }
}
