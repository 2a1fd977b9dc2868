// ==========================================
// 预算看板系统 - 快照领域模型
// ==========================================
// 职责: 一次成功管道周期的完整、自洽结果
// 红线: 快照构建后不可变,只能整体替换
// ==========================================

use crate::domain::company::CompanyRecord;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ==========================================
// Statistics - 汇总统计
// ==========================================
// 说明: 纯粹由 companies 派生,每个周期重新计算
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_companies: usize,
    pub total_contract_value: f64,
    pub total_spent_value: f64,
    pub total_remaining_value: f64,
    pub overall_percentage: f64,

    // ===== 状态分布 =====
    pub ok_count: usize,
    pub warning_count: usize,
    pub critical_count: usize,
}

// ==========================================
// Snapshot - 进程级快照
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// 单调递增版本号 (0 = 启动时的空快照)
    pub revision: u64,
    /// 源文件行序
    pub companies: Vec<CompanyRecord>,
    pub statistics: Statistics,
    pub file_path: Option<String>,
    pub last_update: Option<DateTime<Local>>,
}

impl Snapshot {
    /// 启动时的空快照
    pub fn empty() -> Self {
        Self::default()
    }

    /// 按编码查找公司
    pub fn find_company(&self, code: &str) -> Option<&CompanyRecord> {
        self.companies.iter().find(|c| c.code == code)
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}
