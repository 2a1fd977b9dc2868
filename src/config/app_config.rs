// ==========================================
// 预算看板系统 - 启动配置
// ==========================================
// 职责: 从环境变量加载监听/解析/服务配置,启动时统一校验
// 说明: 监听目录不存在不属于配置错误,由 FileWatcher::start 报告
// ==========================================

use crate::config::column_mapping::{ColumnMapping, CompanyField};
use crate::domain::types::SpentOverridePolicy;
use crate::watcher::FilePattern;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// ==========================================
// 环境变量键
// ==========================================
pub mod config_keys {
    // 监听
    pub const WATCH_FOLDER: &str = "BUDGET_DASHBOARD_WATCH_FOLDER";
    pub const FILE_PATTERN: &str = "BUDGET_DASHBOARD_FILE_PATTERN";
    pub const CHECK_INTERVAL_SECS: &str = "BUDGET_DASHBOARD_CHECK_INTERVAL_SECS";
    pub const SETTLE_DELAY_MS: &str = "BUDGET_DASHBOARD_SETTLE_DELAY_MS";

    // 解析
    pub const PARSE_TIMEOUT_SECS: &str = "BUDGET_DASHBOARD_PARSE_TIMEOUT_SECS";
    pub const COLUMN_CODE: &str = "BUDGET_DASHBOARD_COLUMN_CODE";
    pub const COLUMN_NAME: &str = "BUDGET_DASHBOARD_COLUMN_NAME";
    pub const COLUMN_CONTRACT: &str = "BUDGET_DASHBOARD_COLUMN_CONTRACT";
    pub const COLUMN_SPENT: &str = "BUDGET_DASHBOARD_COLUMN_SPENT";

    // 合并
    pub const ZERO_SPENT_POLICY: &str = "BUDGET_DASHBOARD_ZERO_SPENT_POLICY";

    // 基础设施
    pub const DB_PATH: &str = "BUDGET_DASHBOARD_DB_PATH";
    pub const BIND_ADDR: &str = "BUDGET_DASHBOARD_BIND_ADDR";
}

pub const DEFAULT_WATCH_FOLDER: &str = "./data";
pub const DEFAULT_FILE_PATTERN: &str = "*.xlsx";
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 5;
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 1_000;
pub const DEFAULT_PARSE_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    InvalidValue {
        key: String,
        value: String,
        message: String,
    },
}

// ==========================================
// AppConfig
// ==========================================
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watch_folder: PathBuf,
    pub file_pattern: String,
    pub check_interval: Duration,
    pub settle_delay: Duration,
    pub parse_timeout: Duration,
    pub column_mapping: ColumnMapping,
    pub spent_override_policy: SpentOverridePolicy,
    pub db_path: String,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// 从进程环境变量加载
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载 (便于测试)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut column_mapping = ColumnMapping::default();
        for (key, field) in [
            (config_keys::COLUMN_CODE, CompanyField::Code),
            (config_keys::COLUMN_NAME, CompanyField::Name),
            (config_keys::COLUMN_CONTRACT, CompanyField::ContractValue),
            (config_keys::COLUMN_SPENT, CompanyField::SpentValue),
        ] {
            if let Some(aliases) = get(key) {
                column_mapping.set_aliases(field, &aliases);
            }
        }

        let spent_override_policy = match get(config_keys::ZERO_SPENT_POLICY) {
            None => SpentOverridePolicy::default(),
            Some(raw) => SpentOverridePolicy::parse(&raw).ok_or_else(|| ConfigError::InvalidValue {
                key: config_keys::ZERO_SPENT_POLICY.to_string(),
                value: raw.clone(),
                message: "期望 honor 或 unset".to_string(),
            })?,
        };

        let bind_raw = get(config_keys::BIND_ADDR).unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse::<SocketAddr>().map_err(|e| ConfigError::InvalidValue {
            key: config_keys::BIND_ADDR.to_string(),
            value: bind_raw.clone(),
            message: e.to_string(),
        })?;

        let config = Self {
            watch_folder: PathBuf::from(
                get(config_keys::WATCH_FOLDER).unwrap_or_else(|| DEFAULT_WATCH_FOLDER.to_string()),
            ),
            file_pattern: get(config_keys::FILE_PATTERN)
                .unwrap_or_else(|| DEFAULT_FILE_PATTERN.to_string()),
            check_interval: Duration::from_secs(parse_u64(
                get(config_keys::CHECK_INTERVAL_SECS),
                config_keys::CHECK_INTERVAL_SECS,
                DEFAULT_CHECK_INTERVAL_SECS,
            )?),
            settle_delay: Duration::from_millis(parse_u64(
                get(config_keys::SETTLE_DELAY_MS),
                config_keys::SETTLE_DELAY_MS,
                DEFAULT_SETTLE_DELAY_MS,
            )?),
            parse_timeout: Duration::from_secs(parse_u64(
                get(config_keys::PARSE_TIMEOUT_SECS),
                config_keys::PARSE_TIMEOUT_SECS,
                DEFAULT_PARSE_TIMEOUT_SECS,
            )?),
            column_mapping,
            spent_override_policy,
            db_path: get(config_keys::DB_PATH).unwrap_or_else(get_default_db_path),
            bind_addr,
        };

        config.validate()?;
        Ok(config)
    }

    /// 启动时校验
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: config_keys::CHECK_INTERVAL_SECS.to_string(),
                value: "0".to_string(),
                message: "轮询间隔必须大于 0".to_string(),
            });
        }
        if self.parse_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: config_keys::PARSE_TIMEOUT_SECS.to_string(),
                value: "0".to_string(),
                message: "解析超时必须大于 0".to_string(),
            });
        }
        FilePattern::compile(&self.file_pattern).map_err(|e| ConfigError::InvalidValue {
            key: config_keys::FILE_PATTERN.to_string(),
            value: self.file_pattern.clone(),
            message: e.to_string(),
        })?;
        Ok(())
    }
}

fn parse_u64(raw: Option<String>, key: &str, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<u64>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.clone(),
            message: e.to_string(),
        }),
    }
}

/// 获取默认数据库路径
///
/// # 返回
/// - 用户数据目录/budget-dashboard/budget_dashboard.db
/// - 无法获取数据目录时回退到 ./budget_dashboard.db
pub fn get_default_db_path() -> String {
    let mut path = PathBuf::from("./budget_dashboard.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("budget-dashboard");
        // best-effort: 目录创建失败时仍返回路径,由打开数据库时报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("budget_dashboard.db");
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[(config_keys::DB_PATH, "/tmp/test.db")]).unwrap();
        assert_eq!(config.watch_folder, PathBuf::from(DEFAULT_WATCH_FOLDER));
        assert_eq!(config.file_pattern, DEFAULT_FILE_PATTERN);
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.settle_delay, Duration::from_millis(1_000));
        assert_eq!(config.spent_override_policy, SpentOverridePolicy::HonorZero);
        assert_eq!(config.db_path, "/tmp/test.db");
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            (config_keys::WATCH_FOLDER, "/srv/planilhas"),
            (config_keys::FILE_PATTERN, "orcamento_*.csv"),
            (config_keys::CHECK_INTERVAL_SECS, "2"),
            (config_keys::ZERO_SPENT_POLICY, "unset"),
            (config_keys::COLUMN_CODE, "ID"),
            (config_keys::BIND_ADDR, "0.0.0.0:9000"),
        ])
        .unwrap();
        assert_eq!(config.watch_folder, PathBuf::from("/srv/planilhas"));
        assert_eq!(config.check_interval, Duration::from_secs(2));
        assert_eq!(config.spent_override_policy, SpentOverridePolicy::ZeroMeansUnset);
        assert_eq!(config.column_mapping.code, vec!["ID".to_string()]);
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = load(&[(config_keys::CHECK_INTERVAL_SECS, "0")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_non_numeric_interval_rejected() {
        let result = load(&[(config_keys::CHECK_INTERVAL_SECS, "soon")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_policy_rejected() {
        let result = load(&[(config_keys::ZERO_SPENT_POLICY, "sometimes")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_default_db_path_ends_with_db() {
        let path = get_default_db_path();
        assert!(path.ends_with(".db"));
    }
}
