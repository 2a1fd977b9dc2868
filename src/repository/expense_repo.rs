// ==========================================
// 预算看板系统 - 费用流水数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 表: expenses
// ==========================================

use crate::domain::adjustment::{AdjustmentOverride, Expense};
use crate::repository::adjustment_repo::upsert_with;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = "id, company_code, company_name, description, amount, \
     expense_date, category, notes, created_by, created_at";

// ==========================================
// ExpenseRepository - 费用流水仓储
// ==========================================
pub struct ExpenseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ExpenseRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入流水,返回新 id
    pub fn insert(&self, expense: &Expense) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        insert_with(&conn, expense)
    }

    /// 插入流水并把该公司调整的 spent_value 同步为流水合计 (单事务)
    ///
    /// # 返回
    /// - Ok((id, total)): 新流水 id 与同步后的合计
    pub fn record_and_sync(&self, expense: &Expense) -> RepositoryResult<(i64, f64)> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        let id = insert_with(&tx, expense)?;
        let total = sum_with(&tx, &expense.company_code)?;
        upsert_with(
            &tx,
            &AdjustmentOverride::new(&expense.company_code, &expense.company_name)
                .with_spent_value(total),
        )?;

        tx.commit()?;
        Ok((id, total))
    }

    /// 删除流水 (不存在时返回 NotFound)
    pub fn delete(&self, id: i64) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "Expense".to_string(),
                id: id.to_string(),
            });
        }
        Ok(())
    }

    /// 按公司查询流水 (expense_date 倒序)
    pub fn list_by_company(&self, company_code: &str) -> RepositoryResult<Vec<Expense>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM expenses WHERE company_code = ?1 ORDER BY expense_date DESC, id DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![company_code], map_expense_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    /// 按公司汇总金额 (无流水时为 0)
    pub fn sum_by_company(&self, company_code: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        sum_with(&conn, company_code)
    }
}

fn insert_with(conn: &Connection, expense: &Expense) -> RepositoryResult<i64> {
    if expense.company_code.trim().is_empty() {
        return Err(RepositoryError::FieldValueError {
            field: "company_code".to_string(),
            message: "公司编码不能为空".to_string(),
        });
    }
    if !expense.amount.is_finite() {
        return Err(RepositoryError::FieldValueError {
            field: "amount".to_string(),
            message: format!("金额无效: {}", expense.amount),
        });
    }

    conn.execute(
        r#"
        INSERT INTO expenses (
            company_code, company_name, description, amount,
            expense_date, category, notes, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            expense.company_code,
            expense.company_name,
            expense.description,
            expense.amount,
            expense.expense_date.format("%Y-%m-%d").to_string(),
            expense.category,
            expense.notes,
            expense.created_by,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn sum_with(conn: &Connection, company_code: &str) -> RepositoryResult<f64> {
    let total: Option<f64> = conn.query_row(
        "SELECT SUM(amount) FROM expenses WHERE company_code = ?1",
        params![company_code],
        |row| row.get(0),
    )?;
    Ok(total.unwrap_or(0.0))
}

fn map_expense_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let expense_date: String = row.get(5)?;
    let created_at: Option<String> = row.get(9)?;
    Ok(Expense {
        id: row.get(0)?,
        company_code: row.get(1)?,
        company_name: row.get(2)?,
        description: row.get(3)?,
        amount: row.get(4)?,
        expense_date: NaiveDate::parse_from_str(&expense_date, "%Y-%m-%d").map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?,
        category: row.get(6)?,
        notes: row.get(7)?,
        created_by: row.get(8)?,
        created_at: created_at
            .and_then(|s| NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").ok()),
    })
}
