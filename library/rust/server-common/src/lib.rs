//! comments-server-common: 両プロセスで共有する起動・停止まわりの部品。
//!
//! - `shutdown`: SIGINT / SIGTERM を待つ `shutdown_signal()`
//! - `config`: `CONFIG_PATH` の解決と YAML 設定ファイルの読み込み

#[cfg(any(feature = "config-loader", test))]
pub mod config;
#[cfg(any(feature = "shutdown", test))]
pub mod shutdown;

#[cfg(any(feature = "config-loader", test))]
pub use config::{config_path, load_yaml};
#[cfg(any(feature = "shutdown", test))]
pub use shutdown::shutdown_signal;
