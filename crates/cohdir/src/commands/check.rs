//! Check command.

use cohdir::{DirectoryConfig, DirectoryType};

use crate::cli::{ConfigArgs, EXIT_FAILURE, EXIT_SUCCESS};
use crate::commands::{load_config, log_config_error};

/// Handle the `check` command.
pub fn cmd_check(args: &ConfigArgs) -> i32 {
    let Some(config) = load_config(args) else {
        return EXIT_FAILURE;
    };

    let params = match DirectoryConfig::from_reader(&config) {
        Ok(params) => params,
        Err(e) => {
            log_config_error(args, &e);
            return EXIT_FAILURE;
        }
    };
    let directory = match params.build(&config) {
        Ok(directory) => directory,
        Err(e) => {
            log_config_error(args, &e);
            return EXIT_FAILURE;
        }
    };

    println!("directory_type:  {}", directory.directory_type());
    println!("total_entries:   {}", directory.len());
    println!("max_hw_sharers:  {}", directory.max_hw_sharers());
    println!("total_cores:     {}", directory.max_num_sharers());
    if directory.directory_type() == DirectoryType::Limitless {
        println!("trap_penalty:    {}", directory.software_trap_penalty());
    }
    EXIT_SUCCESS
}
