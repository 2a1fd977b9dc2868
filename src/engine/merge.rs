// ==========================================
// 预算看板系统 - 调整合并引擎
// ==========================================
// 职责: 解析记录 + 人工覆写 + 流水合计 → 最终展示记录
// 输入: 解析后的 CompanyRecord 序列、BudgetLookup
// 输出: MergeReport (合并记录 + 单公司查询失败明细)
// ==========================================
// 优先级 (逐公司独立执行):
// 1. 存在覆写:
//    a. contract_value 已设置 → 替换合同金额
//    b. spent_value 已设置 → 替换已花费金额
//    c. 否则流水合计 > 0 时替换已花费金额
// 2. 不存在覆写: 流水合计 > 0 时替换已花费金额
// 3. 用最终金额重算 percentage / status
// ==========================================

use crate::domain::adjustment::AdjustmentOverride;
use crate::domain::company::CompanyRecord;
use crate::domain::types::SpentOverridePolicy;
use crate::repository::error::RepositoryResult;
use serde::Serialize;
use tracing::error;

// ==========================================
// BudgetLookup Trait
// ==========================================
// 实现者: repository::BudgetStore
pub trait BudgetLookup: Send + Sync {
    /// 按公司编码查找覆写 (0 或 1 条)
    fn find_override(&self, company_code: &str) -> RepositoryResult<Option<AdjustmentOverride>>;

    /// 按公司编码汇总流水金额 (无流水时为 0)
    fn expense_sum(&self, company_code: &str) -> RepositoryResult<f64>;
}

/// 单公司查询失败 (该公司保留解析值)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergeFailure {
    pub company_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    /// 与输入同序
    pub records: Vec<CompanyRecord>,
    pub failures: Vec<MergeFailure>,
}

// ==========================================
// AdjustmentMergeEngine
// ==========================================
pub struct AdjustmentMergeEngine {
    policy: SpentOverridePolicy,
}

impl Default for AdjustmentMergeEngine {
    fn default() -> Self {
        Self::new(SpentOverridePolicy::default())
    }
}

impl AdjustmentMergeEngine {
    pub fn new(policy: SpentOverridePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> SpentOverridePolicy {
        self.policy
    }

    /// 合并整批记录
    ///
    /// 单个公司的查询失败不会中断其他公司,失败公司保留解析值
    pub fn merge(&self, records: &[CompanyRecord], lookup: &dyn BudgetLookup) -> MergeReport {
        let mut report = MergeReport {
            records: Vec::with_capacity(records.len()),
            failures: Vec::new(),
        };

        for record in records {
            match self.merge_one(record, lookup) {
                Ok(merged) => report.records.push(merged),
                Err(e) => {
                    error!(code = %record.code, error = %e, "应用调整失败,保留解析值");
                    report.failures.push(MergeFailure {
                        company_code: record.code.clone(),
                        message: e.to_string(),
                    });
                    report.records.push(record.clone());
                }
            }
        }

        report
    }

    /// 合并单个公司
    pub fn merge_one(
        &self,
        record: &CompanyRecord,
        lookup: &dyn BudgetLookup,
    ) -> RepositoryResult<CompanyRecord> {
        let mut contract_value = record.contract_value;
        let mut spent_value = record.spent_value;

        let explicit_spent = match lookup.find_override(&record.code)? {
            Some(adjustment) => {
                if let Some(contract) = adjustment.contract_value {
                    contract_value = contract;
                }
                self.effective_spent(adjustment.spent_value)
            }
            None => None,
        };

        match explicit_spent {
            Some(spent) => spent_value = spent,
            None => {
                let total = lookup.expense_sum(&record.code)?;
                // 合计为 0 视为"无更好信息",保留解析值
                if total > 0.0 {
                    spent_value = total;
                }
            }
        }

        // 派生字段必须在全部覆写之后重算
        Ok(record.with_values(contract_value, spent_value))
    }

    fn effective_spent(&self, spent: Option<f64>) -> Option<f64> {
        match (self.policy, spent) {
            (SpentOverridePolicy::ZeroMeansUnset, Some(v)) if v == 0.0 => None,
            (_, value) => value,
        }
    }
}
