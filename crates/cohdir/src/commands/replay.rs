//! Replay command.

use std::path::Path;

use cohdir::DirectoryConfig;
use cohdir::script::{Replay, Script};
use tracing::{error, info, info_span};

use crate::cli::{ConfigArgs, EXIT_FAILURE, EXIT_SUCCESS};
use crate::commands::{load_config, log_config_error};

/// Handle the `replay` command.
pub fn cmd_replay(args: &ConfigArgs, script_path: &Path) -> i32 {
    let Some(config) = load_config(args) else {
        return EXIT_FAILURE;
    };

    let mut directory = match DirectoryConfig::from_reader(&config).and_then(|p| p.build(&config)) {
        Ok(directory) => directory,
        Err(e) => {
            log_config_error(args, &e);
            return EXIT_FAILURE;
        }
    };

    let text = match std::fs::read_to_string(script_path) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, path = %script_path.display(), "failed to read script");
            return EXIT_FAILURE;
        }
    };
    let script = match Script::parse(&text) {
        Ok(script) => script,
        Err(e) => {
            error!(error = %e, path = %script_path.display(), "failed to parse script");
            return EXIT_FAILURE;
        }
    };

    let _span = info_span!("replay", path = %script_path.display(), steps = script.len()).entered();
    let mut replay = Replay::new(&mut directory);
    for step in script.steps() {
        match replay.apply(step) {
            Ok(outcome) => println!("{}:{} {}", step.line, step.slot, outcome),
            Err(e) => {
                error!(error = %e, path = %script_path.display(), "replay stopped");
                return EXIT_FAILURE;
            }
        }
    }

    info!(steps = script.len(), "replay complete");
    EXIT_SUCCESS
}
