use VoFlow::Examples::vof_examples::vof_examples;
use VoFlow::Utils::logging::init_logging;
use VoFlow::VoF::run_loop::run_case;
use log::{LevelFilter, error};
use std::path::Path;

/// `VoFlow <case dir>` runs a case; `VoFlow <n>` or no argument runs one of the built-in examples.
pub fn main() {
    let arg = std::env::args().nth(1);
    match arg.as_deref() {
        Some(case) if case.parse::<usize>().is_err() => {
            let log_file = Path::new(case).join("log.vofFoam");
            if let Err(e) = init_logging(LevelFilter::Info, Some(&log_file)) {
                eprintln!("logger: {}", e);
            }
            if let Err(e) = run_case(case) {
                error!("{}", e);
                std::process::exit(1);
            }
        }
        task => {
            if let Err(e) = init_logging(LevelFilter::Info, None) {
                eprintln!("logger: {}", e);
            }
            let task: usize = task.and_then(|t| t.parse().ok()).unwrap_or(0);
            vof_examples(task);
        }
    }
}
