use clap::Parser;
use zenium::cli::{self, Cli, LogLevelArg};
use zenium_config::ShellConfig;

fn main() {
    let cli = Cli::parse();

    // CLI --log-level flag takes highest precedence, then RUST_LOG, then config
    let cli_level = cli.log_level.map(LogLevelArg::to_level_filter);
    zenium::debug::init_log_bridge(cli_level);

    let config = ShellConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config, using defaults: {}", e);
        ShellConfig::default()
    });
    zenium::debug::apply_config_log_level(config.log_level.as_deref(), cli_level);

    log::info!("zenium {}", zenium::VERSION);
    std::process::exit(cli::run_command(cli.command, &config));
}
