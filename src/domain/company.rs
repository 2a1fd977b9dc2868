// ==========================================
// 预算看板系统 - 公司预算记录领域模型
// ==========================================
// 职责: CompanyRecord 及其派生字段 (percentage / status)
// 红线: 派生字段只能由 contract_value / spent_value 计算,不允许单独写入
// ==========================================

use crate::domain::types::BudgetStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// CompanyRecord - 单个公司的预算位置
// ==========================================
// 用途: 快照中的一行,由解析器产出、合并引擎修正
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub code: String,          // 业务编码 (快照内唯一)
    pub name: String,          // 显示名称
    pub contract_value: f64,   // 合同金额 (预算上限)
    pub spent_value: f64,      // 已花费金额
    pub percentage: f64,       // 执行百分比 (2 位小数)
    pub status: BudgetStatus,  // 预算状态
}

impl CompanyRecord {
    /// 创建记录并立即计算派生字段
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        contract_value: f64,
        spent_value: f64,
    ) -> Self {
        let percentage = calculate_percentage(spent_value, contract_value);
        Self {
            code: code.into(),
            name: name.into(),
            contract_value,
            spent_value,
            percentage,
            status: BudgetStatus::from_percentage(percentage),
        }
    }

    /// 以新的金额生成记录 (派生字段随之重算)
    pub fn with_values(&self, contract_value: f64, spent_value: f64) -> Self {
        Self::new(self.code.clone(), self.name.clone(), contract_value, spent_value)
    }

    /// 剩余预算 (可能为负,表示超支)
    pub fn remaining_value(&self) -> f64 {
        self.contract_value - self.spent_value
    }
}

/// 计算执行百分比
///
/// contract_value 为 0 (或非正) 时返回 0,否则 spent / contract * 100 保留 2 位小数
pub fn calculate_percentage(spent_value: f64, contract_value: f64) -> f64 {
    if contract_value > 0.0 {
        round2(spent_value / contract_value * 100.0)
    } else {
        0.0
    }
}

/// 四舍五入到 2 位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
