use thiserror::Error;

/// Directory construction errors.
#[derive(Error, Debug)]
pub enum Error {
    #[error("unsupported directory type '{0}' (expected limited_no_broadcast, limited_broadcast or limitless)")]
    UnsupportedDirectoryType(String),
    #[error("invalid sharer limits: max_hw_sharers = {max_hw_sharers}, max_num_sharers = {max_num_sharers}")]
    InvalidSharerLimits {
        max_hw_sharers: u32,
        max_num_sharers: u32,
    },
    #[error("config error: {0}")]
    Config(#[from] cohdir_config::ConfigError),
    #[error("config key {key} = {value} is out of range")]
    ConfigOutOfRange { key: &'static str, value: i64 },
}

pub type Result<T> = std::result::Result<T, Error>;
