//! INI file configuration adapter.
//!
//! ```ini
//! [engine]
//! worker_threads = 0
//! record_variables = false
//!
//! [logging]
//! level = info
//! ```

use crate::domain::error::StrategistError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, StrategistError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| StrategistError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, StrategistError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| StrategistError::ConfigParse {
                file: "<inline>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_engine_and_logging_sections() {
        let content = r#"
[engine]
worker_threads = 8
record_variables = yes

[logging]
level = debug
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(adapter.get_int("engine", "worker_threads", 0), 8);
        assert!(adapter.get_bool("engine", "record_variables", false));
        assert_eq!(adapter.get_string("logging", "level"), Some("debug".to_string()));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[engine]\n").unwrap();
        assert_eq!(adapter.get_string("engine", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("engine", "worker_threads", 4), 4);
        assert_eq!(adapter.get_double("engine", "ratio", 0.5), 0.5);
        assert!(adapter.get_bool("engine", "record_variables", true));
    }

    #[test]
    fn unparsable_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[engine]\nworker_threads = many\nratio = half\nrecord_variables = maybe\n")
                .unwrap();
        assert_eq!(adapter.get_int("engine", "worker_threads", 2), 2);
        assert_eq!(adapter.get_double("engine", "ratio", 0.25), 0.25);
        assert!(!adapter.get_bool("engine", "record_variables", false));
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string("[flags]\na = On\nb = off\nc = 1\nd = FALSE\n").unwrap();
        assert!(adapter.get_bool("flags", "a", false));
        assert!(!adapter.get_bool("flags", "b", true));
        assert!(adapter.get_bool("flags", "c", false));
        assert!(!adapter.get_bool("flags", "d", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[engine]\nworker_threads = 3\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_int("engine", "worker_threads", 0), 3);
    }

    #[test]
    fn from_file_reports_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/strategist.ini");
        assert!(matches!(result, Err(StrategistError::ConfigParse { .. })));
    }
}
