use std::thread;

use mailsweep_core::{Error, Interrupt};
use tracing::{error, warn};

/// Watches for Ctrl-C on a background thread. The first press asks the run to stop at the
/// next step. The second cuts the server connection so the blocked command fails and the
/// session still logs out; with no connection open yet it exits at once.
pub(crate) fn install_interrupt_handler(interrupt: Interrupt) {
    let spawned = thread::Builder::new()
        .name("ctrl-c".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(err) => {
                    warn!("Ctrl-C handling unavailable: {}", err);
                    return;
                }
            };
            runtime.block_on(async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    if !on_signal(&interrupt) {
                        std::process::exit(Error::Interrupted.exit_code());
                    }
                }
            });
        });
    if let Err(err) = spawned {
        warn!("Ctrl-C handling unavailable: {}", err);
    }
}

/// Returns false when the process should exit without unwinding.
fn on_signal(interrupt: &Interrupt) -> bool {
    if interrupt.trigger() {
        warn!("Interrupt received; stopping after the current step (Ctrl-C again to abort)");
        true
    } else if interrupt.abort() {
        error!("Second interrupt received; cutting the server connection");
        true
    } else {
        error!("Second interrupt received; aborting");
        false
    }
}
