//! # Observability & Tracing
//!
//! The container logs through the `tracing` crate. Object fields use short
//! type names (`object=Settings` rather than `object=my_app::config::Settings`).
//!
//! ## What Gets Traced
//!
//! - **Runs**: start and end of every top-level run at `info`, nested runs and functor calls at `debug`
//! - **Resolution**: objects created at `debug`, arena hits at `trace`
//! - **Teardown**: each destroyed object at `debug`, arena summaries at `info`
//! - **Failures**: failed runs, failed destructors and discarded objects at `warn`
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=info cargo run      # Runs and teardown only
//! RUST_LOG=debug cargo run     # Every object created
//! RUST_LOG=kinit=trace cargo run
//! ```
//!
//! With `RUST_LOG=debug` a small run reads like this:
//!
//! ```text
//! INFO Run started
//! DEBUG Created object=Settings processors=1
//! DEBUG Created object=Catalog processors=1
//! DEBUG Calling functor arguments=2
//! DEBUG Destroyed object=Catalog
//! INFO Arena finalized objects=3 failed=0
//! INFO Run completed
//! ```

/// Installs a compact, `RUST_LOG`-filtered subscriber and reports whether it
/// was installed.
///
/// Calling it again after a subscriber is installed leaves the existing one in
/// place and returns `false`, which keeps it usable from tests.
pub fn setup_tracing() -> bool {
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init()
    {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Keeping installed subscriber");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_setup_keeps_the_installed_subscriber() {
        setup_tracing();
        assert!(!setup_tracing());
    }
}
