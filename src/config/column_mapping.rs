// ==========================================
// 预算看板系统 - 列映射配置
// ==========================================
// 职责: 源表头 → 标准字段 的别名表
// 说明: 别名在比较前都会经过 DataCleaner::normalize_header
// ==========================================

use serde::{Deserialize, Serialize};

/// 标准字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompanyField {
    Code,
    Name,
    ContractValue,
    SpentValue,
}

impl CompanyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompanyField::Code => "code",
            CompanyField::Name => "name",
            CompanyField::ContractValue => "contract_value",
            CompanyField::SpentValue => "spent_value",
        }
    }

    /// 表头识别所必需的字段 (name 缺失时以 code 代替)
    pub fn required() -> [CompanyField; 3] {
        [
            CompanyField::Code,
            CompanyField::ContractValue,
            CompanyField::SpentValue,
        ]
    }
}

// ==========================================
// ColumnMapping - 列别名表
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub code: Vec<String>,
    pub name: Vec<String>,
    pub contract_value: Vec<String>,
    pub spent_value: Vec<String>,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        fn owned(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }

        Self {
            code: owned(&["Código", "Cod", "Cód. Empresa", "Código da Empresa", "code"]),
            name: owned(&["Empresa", "Nome", "Nome da Empresa", "Razão Social", "name"]),
            contract_value: owned(&[
                "Valor do Contrato",
                "Valor Contrato",
                "Contrato",
                "contract_value",
            ]),
            spent_value: owned(&["Valor Gasto", "Gasto", "Valor Utilizado", "Realizado", "spent_value"]),
        }
    }
}

impl ColumnMapping {
    pub fn aliases(&self, field: CompanyField) -> &[String] {
        match field {
            CompanyField::Code => &self.code,
            CompanyField::Name => &self.name,
            CompanyField::ContractValue => &self.contract_value,
            CompanyField::SpentValue => &self.spent_value,
        }
    }

    /// 用逗号分隔的别名列表替换某字段 (空列表忽略)
    pub fn set_aliases(&mut self, field: CompanyField, csv_aliases: &str) {
        let aliases: Vec<String> = csv_aliases
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if aliases.is_empty() {
            return;
        }
        match field {
            CompanyField::Code => self.code = aliases,
            CompanyField::Name => self.name = aliases,
            CompanyField::ContractValue => self.contract_value = aliases,
            CompanyField::SpentValue => self.spent_value = aliases,
        }
    }
}
