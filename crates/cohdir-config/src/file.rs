//! TOML-backed configuration file.
//!
//! Sections nest with dots and are read back with slash-separated paths:
//!
//! ```toml
//! [general]
//! total_cores = 64
//!
//! [perf_model.dram_directory]
//! directory_type = "limitless"
//! total_entries = 16384
//!
//! [perf_model.dram_directory.limitless]
//! software_trap_penalty = 200
//! ```
//!
//! `perf_model/dram_directory/limitless/software_trap_penalty` resolves to 200.

use std::path::Path;

use toml::{Table, Value};
use tracing::debug;

use crate::{ConfigError, ConfigReader};

/// Parsed configuration tree.
#[derive(Clone, Debug, Default)]
pub struct ConfigFile {
    root: Table,
}

impl ConfigFile {
    /// Create an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and parse a configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text)?;
        debug!(path = %path.display(), keys = config.len(), "loaded config");
        Ok(config)
    }

    /// Parse configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if `text` is not valid TOML.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let root = toml::from_str::<Table>(text)?;
        Ok(Self { root })
    }

    /// Set (or override) the value at `path`, creating sections as needed.
    ///
    /// A scalar sitting where a section is needed is replaced by the section.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) {
        let mut segments: Vec<&str> = path.split('/').collect();
        let Some(key) = segments.pop() else {
            return;
        };
        let mut table = &mut self.root;
        for segment in segments {
            let slot = table
                .entry(segment)
                .or_insert_with(|| Value::Table(Table::new()));
            if !slot.is_table() {
                *slot = Value::Table(Table::new());
            }
            let Value::Table(inner) = slot else {
                unreachable!("slot was just made a table");
            };
            table = inner;
        }
        table.insert(key.to_string(), value.into());
    }

    /// Apply a `path=value` override, as given on the command line.
    ///
    /// The value is stored as a string and converted when read.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if the override has no `=`
    /// or an empty path.
    pub fn apply_override(&mut self, spec: &str) -> Result<(), ConfigError> {
        let (path, value) = spec
            .split_once('=')
            .filter(|(path, _)| !path.trim().is_empty())
            .ok_or_else(|| ConfigError::InvalidOverride(spec.to_string()))?;
        self.set(path.trim(), value.trim());
        Ok(())
    }

    /// Value at a slash-separated `path`, if present.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let (sections, key) = match path.rsplit_once('/') {
            Some((sections, key)) => (Some(sections), key),
            None => (None, path),
        };
        let mut table = &self.root;
        for segment in sections.into_iter().flat_map(|s| s.split('/')) {
            table = table.get(segment)?.as_table()?;
        }
        table.get(key)
    }

    /// Whether a value is stored at `path`.
    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Number of leaf values.
    #[must_use]
    pub fn len(&self) -> usize {
        fn leaves(table: &Table) -> usize {
            table
                .values()
                .map(|v| v.as_table().map_or(1, leaves))
                .sum()
        }
        leaves(&self.root)
    }

    /// Whether no values are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ConfigReader for ConfigFile {
    fn get_string(&self, path: &str) -> Result<String, ConfigError> {
        match self.lookup(path) {
            None => Err(ConfigError::KeyNotFound(path.to_string())),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Integer(i)) => Ok(i.to_string()),
            Some(Value::Float(f)) => Ok(f.to_string()),
            Some(Value::Boolean(b)) => Ok(b.to_string()),
            Some(Value::Datetime(d)) => Ok(d.to_string()),
            Some(other @ (Value::Array(_) | Value::Table(_))) => Err(ConfigError::invalid(
                path,
                &other.to_string(),
                "scalar value",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
# Directory setup
[general]
total_cores = 64

[perf_model.dram_directory]
directory_type = "limitless"   # trailing comment
total_entries = 16384
max_hw_sharers = 4
label = "dir # 0"

[perf_model.dram_directory.limitless]
software_trap_penalty = 200
"#;

    #[test]
    fn test_parse_sections() {
        let config = ConfigFile::parse(SAMPLE).unwrap();
        assert_eq!(config.get_int("general/total_cores").unwrap(), 64);
        assert_eq!(
            config.get_string("perf_model/dram_directory/directory_type").unwrap(),
            "limitless"
        );
        assert_eq!(
            config
                .get_int("perf_model/dram_directory/limitless/software_trap_penalty")
                .unwrap(),
            200
        );
        assert_eq!(
            config.get_string("perf_model/dram_directory/label").unwrap(),
            "dir # 0"
        );
        assert_eq!(config.len(), 6);
    }

    #[test]
    fn test_top_level_keys() {
        let config = ConfigFile::parse("verbose = true\n[a]\nb = 2").unwrap();
        assert_eq!(config.get_string("verbose").unwrap(), "true");
        assert_eq!(config.get_int("a/b").unwrap(), 2);
    }

    #[test]
    fn test_missing_key() {
        let config = ConfigFile::parse(SAMPLE).unwrap();
        let err = config.get_int("perf_model/dram_directory/associativity").unwrap_err();
        assert!(err.is_not_found());
        // Walking through a scalar is a miss, not a panic
        assert!(config.get_int("general/total_cores/x").unwrap_err().is_not_found());
    }

    #[test]
    fn test_invalid_int() {
        let config = ConfigFile::parse("[x]\ny = \"fast\"").unwrap();
        let err = config.get_int("x/y").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { expected: "integer", .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_section_is_not_a_value() {
        let config = ConfigFile::parse(SAMPLE).unwrap();
        let err = config.get_string("perf_model/dram_directory").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { expected: "scalar value", .. }));
    }

    #[test]
    fn test_parse_errors() {
        for text in [
            "[ok]\na = 1\nnot a pair",
            "[broken",
            "s = \"open",
            "[a]\nx = 5\"  # note",
            "z = \"a\" b",
        ] {
            assert!(
                matches!(ConfigFile::parse(text), Err(ConfigError::Parse(_))),
                "{text:?}"
            );
        }
    }

    #[test]
    fn test_hash_inside_string_is_kept() {
        let config = ConfigFile::parse("[a]\nx = \"5 # not a comment\"  # note").unwrap();
        assert_eq!(config.get_string("a/x").unwrap(), "5 # not a comment");
    }

    #[test]
    fn test_override() {
        let mut config = ConfigFile::parse(SAMPLE).unwrap();
        config
            .apply_override("perf_model/dram_directory/max_hw_sharers=8")
            .unwrap();
        assert_eq!(config.get_int("perf_model/dram_directory/max_hw_sharers").unwrap(), 8);
        config.apply_override("new/section/key = on").unwrap();
        assert_eq!(config.get_string("new/section/key").unwrap(), "on");

        for bad in ["no_equals", "=5", " = 5"] {
            assert!(
                matches!(config.apply_override(bad), Err(ConfigError::InvalidOverride(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_set_replaces_scalar_with_section() {
        let mut config = ConfigFile::new();
        config.set("a", 1_i64);
        config.set("a/b", 2_i64);
        assert_eq!(config.get_int("a/b").unwrap(), 2);
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let config = ConfigFile::load(file.path()).unwrap();
        assert!(config.contains("general/total_cores"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigFile::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_reader_through_reference() {
        fn read(reader: &dyn ConfigReader) -> i64 {
            reader.get_int("a/b").unwrap()
        }
        let mut config = ConfigFile::new();
        config.set("a/b", "-7");
        assert_eq!(read(&config), -7);
    }
}
