use std::env;
use std::process::ExitCode;

use tracing::error;

mod app;
mod config;
mod error;
mod script;

fn main() -> ExitCode {
    // Also picks up the `log` records of palm_lib
    tracing_subscriber::fmt::init();

    match app::App::start(env::args().skip(1)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
