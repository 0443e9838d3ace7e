//! # Order Desk
//!
//! Entry point of the demo. It:
//! 1. Reads [`Settings`] from the environment.
//! 2. Wires the desk and inspects the wiring before running anything.
//! 3. Runs one session that places orders in per-request sub-scopes.
//! 4. Reports what was placed and which confirmations were delivered.
//!
//! ```bash
//! RUST_LOG=info cargo run -p kinit-sample
//! RUST_LOG=debug ORDER_DESK_MAX_QUANTITY=1 cargo run -p kinit-sample
//! ```

use kinit::tracing::setup_tracing;
use kinit::{Container, InspectOptions};
use kinit_sample::config::Settings;
use kinit_sample::lifecycle::{demo_session, inspector, wire, SessionReport};
use kinit_sample::services::Outbox;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::{error, info};

fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    let settings = Settings::from_env().map_err(|e| e.to_string())?;
    info!(store = %settings.store_name, "Starting order desk");

    let outbox = Outbox::new();
    let container = Container::new();
    wire(&container, settings, outbox.clone()).map_err(|e| e.to_string())?;
    inspector()
        .and_then(|inspector| inspector.inspect(&container, &InspectOptions::default()))
        .map_err(|e| {
            error!(error = %e, "Wiring is incomplete");
            e.to_string()
        })?;

    let report = Rc::new(RefCell::new(SessionReport::default()));
    container
        .run([demo_session(Rc::clone(&report))])
        .map_err(|e| e.to_string())?;

    let report = report.borrow();
    info!(
        placed = report.placed.len(),
        rejected = report.rejected.len(),
        "Session finished"
    );
    for notification in outbox.delivered() {
        info!(%notification, "Confirmation delivered");
    }
    Ok(())
}
