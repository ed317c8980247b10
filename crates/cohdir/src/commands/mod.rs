//! Command implementations.
//!
//! Each submodule handles a specific CLI command.

mod check;
mod replay;

use cohdir_config::{ConfigError, ConfigFile};
use tracing::{debug, error};

use crate::cli::{Cli, Commands, ConfigArgs};

/// Dispatch CLI command to the appropriate handler.
pub fn run_command(cli: &Cli) -> i32 {
    match &cli.command {
        Commands::Replay { config, script } => replay::cmd_replay(config, script),
        Commands::Check { config } => check::cmd_check(config),
    }
}

/// Load the configuration file and apply `--set` overrides in order.
fn load_config(args: &ConfigArgs) -> Option<ConfigFile> {
    let mut config = match ConfigFile::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, path = %args.config.display(), "failed to load config");
            return None;
        }
    };

    for spec in &args.overrides {
        if let Err(e) = config.apply_override(spec) {
            error!(error = %e, value = %spec, "invalid --set override");
            return None;
        }
        debug!(value = %spec, "applied config override");
    }

    Some(config)
}

/// Log a library error with the config file it came from.
fn log_config_error(args: &ConfigArgs, e: &cohdir::Error) {
    if let cohdir::Error::Config(ConfigError::KeyNotFound(key)) = e {
        error!(key = %key, path = %args.config.display(), "missing required config key");
    } else {
        error!(error = %e, path = %args.config.display(), "invalid directory configuration");
    }
}
