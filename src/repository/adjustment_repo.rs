// ==========================================
// 预算看板系统 - 公司调整数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: company_adjustments (company_code 唯一)
// ==========================================

use crate::domain::adjustment::AdjustmentOverride;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str =
    "company_code, company_name, contract_value, spent_value, reason, updated_at";

// ==========================================
// AdjustmentRepository - 调整仓储
// ==========================================
pub struct AdjustmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AdjustmentRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 按公司编码查询 (0 或 1 条)
    pub fn find_by_code(&self, company_code: &str) -> RepositoryResult<Option<AdjustmentOverride>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM company_adjustments WHERE company_code = ?1",
            SELECT_COLUMNS
        );
        let result = conn
            .query_row(&sql, params![company_code], map_adjustment_row)
            .optional()?;
        Ok(result)
    }

    /// 查询全部调整 (按公司名称排序)
    pub fn list(&self) -> RepositoryResult<Vec<AdjustmentOverride>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM company_adjustments ORDER BY company_name, company_code",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_adjustment_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 插入或部分更新调整
    ///
    /// # 说明
    /// - contract_value / spent_value 只有为 Some 时才覆盖已有值
    /// - reason 只有非空时才覆盖
    /// - company_name 只在新建时写入
    pub fn upsert(&self, adjustment: &AdjustmentOverride) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        upsert_with(&conn, adjustment)
    }

    /// 删除调整 (不存在时返回 NotFound)
    pub fn delete(&self, company_code: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM company_adjustments WHERE company_code = ?1",
            params![company_code],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "CompanyAdjustment".to_string(),
                id: company_code.to_string(),
            });
        }
        Ok(())
    }
}

/// 在给定连接 (或事务) 上执行 upsert
pub(crate) fn upsert_with(conn: &Connection, adjustment: &AdjustmentOverride) -> RepositoryResult<()> {
    if adjustment.company_code.trim().is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "company_code".to_string(),
            message: "公司编码不能为空".to_string(),
        });
    }

    conn.execute(
        r#"
        INSERT INTO company_adjustments (
            company_code, company_name, contract_value, spent_value, reason
        ) VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(company_code) DO UPDATE SET
            contract_value = COALESCE(excluded.contract_value, company_adjustments.contract_value),
            spent_value = COALESCE(excluded.spent_value, company_adjustments.spent_value),
            reason = CASE WHEN excluded.reason <> '' THEN excluded.reason ELSE company_adjustments.reason END,
            updated_at = datetime('now')
        "#,
        params![
            adjustment.company_code,
            adjustment.company_name,
            adjustment.contract_value,
            adjustment.spent_value,
            adjustment.reason,
        ],
    )?;
    Ok(())
}

fn map_adjustment_row(row: &Row<'_>) -> rusqlite::Result<AdjustmentOverride> {
    let updated_at: Option<String> = row.get(5)?;
    Ok(AdjustmentOverride {
        company_code: row.get(0)?,
        company_name: row.get(1)?,
        contract_value: row.get(2)?,
        spent_value: row.get(3)?,
        reason: row.get(4)?,
        updated_at: updated_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
    })
}
