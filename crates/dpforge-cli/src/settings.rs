use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dpforge_codegen::{DEFAULT_DEPENDENCIES, GeneratorOptions};

pub const DEFAULT_SETTINGS_PATH: &str = "dpforge.toml";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml decode error in {path}: {source}")]
    TomlDecode {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub type SettingsResult<T> = Result<T, SettingsError>;

/// External formatter run over every generated program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for FormatterSettings {
    fn default() -> Self {
        Self {
            program: "black".to_string(),
            args: ["-q", "-l", "74", "-"].map(String::from).to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub run_dir: PathBuf,
    pub dependencies: String,
    pub confidence: f64,
    pub delta: f64,
    pub max_partition_length: u64,
    pub max_num_partitions: u64,
    pub txt_report_path: String,
    pub csv_report_path: String,
    /// No formatter runs unless a `[formatter]` table is present.
    pub formatter: Option<FormatterSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let options = GeneratorOptions::default();
        Self {
            run_dir: PathBuf::from("runs"),
            dependencies: DEFAULT_DEPENDENCIES.to_string(),
            confidence: options.confidence,
            delta: options.delta,
            max_partition_length: options.max_partition_length,
            max_num_partitions: options.max_num_partitions,
            txt_report_path: options.txt_report_path,
            csv_report_path: options.csv_report_path,
            formatter: None,
        }
    }
}

impl Settings {
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            dependencies: self.dependencies.clone(),
            confidence: self.confidence,
            max_partition_length: self.max_partition_length,
            max_num_partitions: self.max_num_partitions,
            delta: self.delta,
            txt_report_path: self.txt_report_path.clone(),
            csv_report_path: self.csv_report_path.clone(),
        }
    }
}

/// Settings from `path`, or defaults when the file does not exist.
pub fn load_settings(path: &Path) -> SettingsResult<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let content = std::fs::read_to_string(path)?;
    parse_settings(&content).map_err(|source| SettingsError::TomlDecode {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_settings(content: &str) -> Result<Settings, toml::de::Error> {
    toml::from_str(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let settings =
            load_settings(Path::new("does/not/exist/dpforge.toml")).expect("defaults");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.run_dir, PathBuf::from("runs"));
        assert!(settings.formatter.is_none());
        assert_eq!(settings.generator_options(), GeneratorOptions::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let settings = parse_settings(
            r#"
run_dir = "out/runs"
confidence = 0.9

[formatter]
program = "ruff"
"#,
        )
        .expect("parse");
        assert_eq!(settings.run_dir, PathBuf::from("out/runs"));
        assert_eq!(settings.confidence, 0.9);
        assert_eq!(settings.max_num_partitions, 100);
        let formatter = settings.formatter.expect("formatter table");
        assert_eq!(formatter.program, "ruff");
        assert_eq!(formatter.args, vec!["-q", "-l", "74", "-"]);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(parse_settings("confidence = \"high\"").is_err());
    }
}
