//! YAML 設定ファイルの読み込み。

use std::path::Path;

use anyhow::Context as _;
use serde::de::DeserializeOwned;

/// CONFIG_PATH が未設定のときに読み込むパス。
pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// config_path は環境変数 CONFIG_PATH を優先して設定ファイルのパスを返す。
pub fn config_path() -> String {
    resolve_config_path(std::env::var("CONFIG_PATH").ok())
}

fn resolve_config_path(from_env: Option<String>) -> String {
    from_env
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
}

/// load_yaml はファイルを読み込み、YAML として T にデシリアライズする。
pub fn load_yaml<T: DeserializeOwned>(path: impl AsRef<Path>) -> anyhow::Result<T> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let cfg = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        port: u16,
    }

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("{}-{name}", std::process::id()));
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_resolve_config_path() {
        assert_eq!(resolve_config_path(None), DEFAULT_CONFIG_PATH);
        assert_eq!(resolve_config_path(Some("  ".to_string())), DEFAULT_CONFIG_PATH);
        assert_eq!(
            resolve_config_path(Some("/etc/comments/worker.yaml".to_string())),
            "/etc/comments/worker.yaml"
        );
    }

    #[test]
    fn test_load_yaml() {
        let path = write_temp("sample.yaml", "name: comments\nport: 3000\n");
        let sample: Sample = load_yaml(&path).unwrap();
        assert_eq!(sample.name, "comments");
        assert_eq!(sample.port, 3000);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_yaml_missing_file() {
        let err = load_yaml::<Sample>("/nonexistent/comments.yaml").unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }

    #[test]
    fn test_load_yaml_invalid() {
        let path = write_temp("invalid.yaml", "port: not-a-number\n");
        let err = load_yaml::<Sample>(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
        std::fs::remove_file(path).ok();
    }
}
