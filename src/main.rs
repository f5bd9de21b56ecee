use sol::commands::Session;
use sol::config::{get_config_path, read_config, Config};
use sol::host::SystemHost;
use sol::ledger::Ledger;
use sol::logging::init_tracing;
use sol::planner::build_generator;
use sol::ui::StdConsole;
use std::env;
use tracing::warn;

fn print_usage() {
    eprintln!("usage: sol [-h | --help]");
    eprintln!();
    eprintln!("Interactive assistant. Type a request, review the plan, confirm.");
    eprintln!("  config: {}", get_config_path().display());
    eprintln!("  SOL_CONFIG overrides the config path; RUST_LOG overrides log level.");
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => {}
        Some("-h") | Some("--help") => {
            print_usage();
            return;
        }
        Some(other) => {
            eprintln!("sol: unknown argument '{}'", other);
            print_usage();
            std::process::exit(1);
        }
    }

    let config_path = get_config_path();
    let (config, load_error) = match read_config(&config_path) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(config.debug_mode);
    let persist_config = load_error.is_none();
    if let Some(e) = load_error {
        warn!("{}; using defaults", e);
    }

    let ledger = Ledger::open(&config.history);
    let generator = build_generator(&config);
    let mut session = Session::new(config, config_path, SystemHost, generator, ledger)
        .with_config_persistence(persist_config);
    session.run(&mut StdConsole);
}
