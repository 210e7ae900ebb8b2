use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::Duration;
use serde::Deserialize;
use serde_with::{DurationSeconds, serde_as};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum ConfigError {
    #[error("Failed to load {0}. error: {1}")]
    LoadFileError(PathBuf, io::ErrorKind),
    #[error(transparent)]
    TomlParseError(#[from] toml::de::Error),
}

fn default_retransmit_interval() -> Duration {
    Duration::seconds(1)
}

fn default_advertise_interval() -> Duration {
    Duration::seconds(10)
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct Config {
    /// 使用するネットワークインターフェース名
    pub(crate) interface: Option<String>,

    /// rs/ns操作での再送間隔(秒)
    #[serde_as(as = "DurationSeconds<i64>")]
    #[serde(default = "default_retransmit_interval")]
    pub(crate) retransmit_interval: Duration,

    /// ra操作での定期送信間隔(秒)
    #[serde_as(as = "DurationSeconds<i64>")]
    #[serde(default = "default_advertise_interval")]
    pub(crate) advertise_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            interface: None,
            retransmit_interval: default_retransmit_interval(),
            advertise_interval: default_advertise_interval(),
        }
    }
}

impl Config {
    pub(crate) fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFileError(path.to_path_buf(), e.kind()))?;
        toml::from_str(&content).map_err(ConfigError::TomlParseError)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn test_load() {
        // [正常系] 有効なTOMLファイルを読み込む
        let toml_content = r#"
interface = "eth0"
retransmit_interval = 2
advertise_interval = 30
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.interface.as_deref(), Some("eth0"));
        assert_eq!(config.retransmit_interval, Duration::seconds(2));
        assert_eq!(config.advertise_interval, Duration::seconds(30));

        // [正常系] 省略されたフィールドはデフォルト値になる
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"").unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.interface, None);
        assert_eq!(config.retransmit_interval, Duration::seconds(1));
        assert_eq!(config.advertise_interval, Duration::seconds(10));

        // [異常系] 存在しないファイルを読み込む
        let result = Config::load("/path/to/non/existent/file.toml");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::LoadFileError(_, io::ErrorKind::NotFound)
        ));

        // [異常系] 無効なTOMLファイルを読み込む
        let invalid_toml = r#"
invalid toml content
[unclosed section
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(invalid_toml.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let result = Config::load(temp_file.path());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::TomlParseError(_)
        ));
    }
}
