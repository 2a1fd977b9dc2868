// ==========================================
// 预算看板系统 - 调整/流水存储聚合
// ==========================================
// 职责: 共享一条连接组合两类仓储,并为合并引擎提供查询接口
// 说明: 引擎层定义 BudgetLookup,仓储层实现 (依赖倒置)
// ==========================================

use crate::db::open_and_prepare;
use crate::domain::adjustment::{AdjustmentOverride, Expense};
use crate::engine::merge::BudgetLookup;
use crate::repository::adjustment_repo::AdjustmentRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::expense_repo::ExpenseRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct BudgetStore {
    pub adjustments: AdjustmentRepository,
    pub expenses: ExpenseRepository,
}

impl BudgetStore {
    /// 打开数据库文件 (自动建表)
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_and_prepare(db_path)?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            adjustments: AdjustmentRepository::from_connection(conn.clone()),
            expenses: ExpenseRepository::from_connection(conn),
        }
    }

    /// 公司流水明细 (导出用)
    pub fn expenses_for(&self, company_code: &str) -> RepositoryResult<Vec<Expense>> {
        self.expenses.list_by_company(company_code)
    }
}

impl BudgetLookup for BudgetStore {
    fn find_override(&self, company_code: &str) -> RepositoryResult<Option<AdjustmentOverride>> {
        self.adjustments.find_by_code(company_code)
    }

    fn expense_sum(&self, company_code: &str) -> RepositoryResult<f64> {
        self.expenses.sum_by_company(company_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_file_and_lookup() {
        let file = NamedTempFile::new().unwrap();
        let store = BudgetStore::open(file.path().to_str().unwrap()).unwrap();

        store
            .adjustments
            .upsert(&AdjustmentOverride::new("C001", "Alfa").with_contract_value(10.0))
            .unwrap();
        store
            .expenses
            .insert(&Expense::new("C001", "Alfa", 3.0, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap()))
            .unwrap();

        let found = store.find_override("C001").unwrap().unwrap();
        assert_eq!(found.contract_value, Some(10.0));
        assert_eq!(store.expense_sum("C001").unwrap(), 3.0);
        assert_eq!(store.expenses_for("C001").unwrap().len(), 1);
    }
}
