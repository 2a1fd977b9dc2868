// ==========================================
// 预算看板系统 - 配置层
// ==========================================
// 职责: 启动配置加载与校验、列映射
// 来源: 环境变量 (启动时一次性读取)
// ==========================================

pub mod app_config;
pub mod column_mapping;

// 重导出
pub use app_config::{config_keys, get_default_db_path, AppConfig, ConfigError};
pub use column_mapping::{ColumnMapping, CompanyField};
