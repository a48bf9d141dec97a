use device_tracker::{
    arguments::{
        get_enabled_debug_modes, is_init_config_enabled, patterns, print_help,
        validate_host_argument, validate_port_argument,
    },
    config,
    logger::{self, LogTag},
    paths,
};

#[tokio::main]
async fn main() {
    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    if patterns::is_version_requested() {
        println!("device-tracker {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    if let Err(e) = validate_port_argument().and_then(|_| validate_host_argument()) {
        eprintln!("Invalid arguments: {}", e);
        eprintln!("Run with --help for usage.");
        std::process::exit(2);
    }

    // Logger needs the logs directory to exist
    if let Err(e) = paths::ensure_all_directories() {
        eprintln!("Failed to create required directories: {}", e);
        std::process::exit(1);
    }

    logger::init();

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes enabled: {}", debug_modes.join(", ")),
        );
    }

    if is_init_config_enabled() {
        let path = paths::get_config_path();
        if path.exists() {
            logger::error(
                LogTag::Config,
                &format!("Refusing to overwrite existing {}", path.display()),
            );
            std::process::exit(1);
        }
        match config::save_config(&path) {
            Ok(()) => {
                logger::info(
                    LogTag::Config,
                    &format!("Wrote default configuration to {}", path.display()),
                );
                logger::flush();
                std::process::exit(0);
            }
            Err(e) => {
                logger::error(LogTag::Config, &e);
                std::process::exit(1);
            }
        }
    }

    if let Err(e) = device_tracker::run::run_server().await {
        logger::error(LogTag::System, &format!("Fatal: {}", e));
        logger::flush();
        std::process::exit(1);
    }
}
