// ==========================================
// 预算看板系统 - 人工调整与费用流水领域模型
// ==========================================
// 职责: 持久化的覆写记录 (AdjustmentOverride) 与费用流水 (Expense)
// 说明: 两者由仓储层读写,合并引擎只读
// ==========================================

use crate::domain::company::CompanyRecord;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ==========================================
// AdjustmentOverride - 公司金额人工覆写
// ==========================================
// 主键: company_code (唯一)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentOverride {
    pub company_code: String,
    pub company_name: String,
    pub contract_value: Option<f64>, // 若存在则替换解析值
    pub spent_value: Option<f64>,    // 若存在则替换解析值/流水合计
    pub reason: String,              // 调整原因 (合并逻辑不使用)
    pub updated_at: Option<NaiveDateTime>,
}

impl AdjustmentOverride {
    pub fn new(company_code: impl Into<String>, company_name: impl Into<String>) -> Self {
        Self {
            company_code: company_code.into(),
            company_name: company_name.into(),
            contract_value: None,
            spent_value: None,
            reason: String::new(),
            updated_at: None,
        }
    }

    pub fn with_contract_value(mut self, value: f64) -> Self {
        self.contract_value = Some(value);
        self
    }

    pub fn with_spent_value(mut self, value: f64) -> Self {
        self.spent_value = Some(value);
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

// ==========================================
// Expense - 费用流水
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Option<i64>, // 新建时为 None
    pub company_code: String,
    pub company_name: String,
    pub description: String,
    pub amount: f64,
    pub expense_date: NaiveDate,
    pub category: String,
    pub notes: String,
    pub created_by: String,
    pub created_at: Option<NaiveDateTime>,
}

impl Expense {
    pub fn new(
        company_code: impl Into<String>,
        company_name: impl Into<String>,
        amount: f64,
        expense_date: NaiveDate,
    ) -> Self {
        Self {
            id: None,
            company_code: company_code.into(),
            company_name: company_name.into(),
            description: String::new(),
            amount,
            expense_date,
            category: String::new(),
            notes: String::new(),
            created_by: String::new(),
            created_at: None,
        }
    }
}

// ==========================================
// CompanyExpenseReport - 导出输入
// ==========================================
// 用途: 提供给下载/导出功能 (合并后的记录 + 原始流水)
#[derive(Debug, Clone, Serialize)]
pub struct CompanyExpenseReport {
    pub company: CompanyRecord,
    pub expenses: Vec<Expense>,
}
