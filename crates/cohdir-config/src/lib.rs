//! Configuration access for the coherence directory.
//!
//! Consumers depend on the [`ConfigReader`] capability rather than a global
//! simulator config, so a directory can be built from a parsed
//! [`ConfigFile`], a test fixture, or any other key/value source.
//!
//! Keys are slash-separated paths. The last component names the key and the
//! rest names its (possibly nested) section:
//!
//! ```toml
//! [perf_model.dram_directory.limitless]
//! software_trap_penalty = 200
//! ```
//!
//! is read back as `perf_model/dram_directory/limitless/software_trap_penalty`.

mod error;
mod file;

pub use error::ConfigError;
pub use file::ConfigFile;

/// Read access to typed configuration values.
pub trait ConfigReader {
    /// Raw string value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] if no value is stored at `path`.
    fn get_string(&self, path: &str) -> Result<String, ConfigError>;

    /// Integer value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::KeyNotFound`] if the key is missing or
    /// [`ConfigError::InvalidValue`] if it does not hold an integer.
    fn get_int(&self, path: &str) -> Result<i64, ConfigError> {
        let value = self.get_string(path)?;
        value
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(path, &value, "integer"))
    }
}

impl<T: ConfigReader + ?Sized> ConfigReader for &T {
    fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        (**self).get_string(path)
    }
}
