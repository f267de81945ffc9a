use clap::Parser;
use mailsweep_core::{Error, Interrupt};
use tracing::{error, warn};

mod cli;
mod interrupt_mod;
mod logging_mod;
mod run_mod;

use cli::Cli;
use interrupt_mod::install_interrupt_handler;
use logging_mod::init_logging;
use run_mod::{exit_code, run};

fn main() {
    let cli = Cli::parse();
    init_logging();
    let interrupt = Interrupt::new();
    install_interrupt_handler(interrupt.clone());

    let code = match run(&cli, &interrupt) {
        Ok(()) => 0,
        Err(err) => {
            let code = exit_code(&err);
            if code == Error::Interrupted.exit_code() {
                warn!("Operation interrupted; re-run to finish removing flagged messages");
            } else {
                error!("{:#}", err);
            }
            code
        }
    };
    std::process::exit(code);
}
