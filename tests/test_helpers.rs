// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、表格文件生成等功能
// ==========================================

#![allow(dead_code)]

use budget_dashboard::config::{config_keys, AppConfig};
use budget_dashboard::db::{ensure_schema, open_sqlite_connection};
use budget_dashboard::repository::BudgetStore;
use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

/// 默认表头 (分号分隔)
pub const SHEET_HEADER: &str = "Código;Empresa;Valor do Contrato;Valor Gasto";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    ensure_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建临时数据库并打开 BudgetStore
pub fn create_test_store() -> Result<(NamedTempFile, Arc<BudgetStore>), Box<dyn Error>> {
    let (temp_file, db_path) = create_test_db()?;
    let store = BudgetStore::open(&db_path)?;
    Ok((temp_file, Arc::new(store)))
}

/// 写入分号分隔的预算表 (code, name, contract, spent)
pub fn write_sheet(dir: &Path, file_name: &str, rows: &[(&str, &str, &str, &str)]) -> PathBuf {
    let mut content = String::from(SHEET_HEADER);
    content.push('\n');
    for (code, name, contract, spent) in rows {
        content.push_str(&format!("{};{};{};{}\n", code, name, contract, spent));
    }
    let path = dir.join(file_name);
    fs::write(&path, content).unwrap();
    path
}

/// 写入任意文本内容
pub fn write_raw(dir: &Path, file_name: &str, content: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, content).unwrap();
    path
}

/// 测试配置: CSV 模式、短间隔,数据库指向临时文件
pub fn test_config(db_path: &str, watch_folder: &Path) -> AppConfig {
    let values: HashMap<&str, String> = HashMap::from([
        (config_keys::DB_PATH, db_path.to_string()),
        (config_keys::WATCH_FOLDER, watch_folder.display().to_string()),
        (config_keys::FILE_PATTERN, "*.csv".to_string()),
        (config_keys::CHECK_INTERVAL_SECS, "1".to_string()),
        (config_keys::SETTLE_DELAY_MS, "10".to_string()),
        (config_keys::PARSE_TIMEOUT_SECS, "10".to_string()),
    ]);
    AppConfig::from_lookup(|key| values.get(key).cloned()).unwrap()
}
