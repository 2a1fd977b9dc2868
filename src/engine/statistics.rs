// ==========================================
// 预算看板系统 - 汇总统计
// ==========================================
// 职责: 记录序列 → Statistics (纯函数,每周期重算)
// ==========================================

use crate::domain::company::{calculate_percentage, round2, CompanyRecord};
use crate::domain::snapshot::Statistics;
use crate::domain::types::BudgetStatus;

/// 计算汇总统计
pub fn compute_statistics(records: &[CompanyRecord]) -> Statistics {
    let mut stats = Statistics {
        total_companies: records.len(),
        ..Statistics::default()
    };

    for record in records {
        stats.total_contract_value += record.contract_value;
        stats.total_spent_value += record.spent_value;
        match record.status {
            BudgetStatus::Ok => stats.ok_count += 1,
            BudgetStatus::Warning => stats.warning_count += 1,
            BudgetStatus::Critical => stats.critical_count += 1,
        }
    }

    stats.total_contract_value = round2(stats.total_contract_value);
    stats.total_spent_value = round2(stats.total_spent_value);
    stats.total_remaining_value = round2(stats.total_contract_value - stats.total_spent_value);
    stats.overall_percentage =
        calculate_percentage(stats.total_spent_value, stats.total_contract_value);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_records() {
        let stats = compute_statistics(&[]);
        assert_eq!(stats, Statistics::default());
    }

    #[test]
    fn test_totals_and_counts() {
        let records = vec![
            CompanyRecord::new("A", "A", 100.0, 50.0),  // ok
            CompanyRecord::new("B", "B", 100.0, 80.0),  // warning
            CompanyRecord::new("C", "C", 200.0, 190.0), // critical
        ];

        let stats = compute_statistics(&records);

        assert_eq!(stats.total_companies, 3);
        assert_eq!(stats.total_contract_value, 400.0);
        assert_eq!(stats.total_spent_value, 320.0);
        assert_eq!(stats.total_remaining_value, 80.0);
        assert_eq!(stats.overall_percentage, 80.0);
        assert_eq!((stats.ok_count, stats.warning_count, stats.critical_count), (1, 1, 1));
    }
}
