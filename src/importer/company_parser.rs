// ==========================================
// 预算看板系统 - 公司预算表解析器
// ==========================================
// 职责: 源文件 → CompanyRecord 序列 (源文件行序)
// 流程: 读取网格 → 定位表头 → 行映射 → 金额解析 → 派生字段
// 容错: 缺编码/重复编码的行跳过,坏金额按 0 处理,只在读不到文件或无表头时失败
// ==========================================

use crate::config::column_mapping::{ColumnMapping, CompanyField};
use crate::domain::company::CompanyRecord;
use crate::importer::data_cleaner::{CellValue, DataCleaner};
use crate::importer::error::ImportResult;
use crate::importer::field_mapper::FieldMapper;
use crate::importer::file_parser::{FileParser, RawCell, UniversalFileParser};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

// ==========================================
// 解析报告
// ==========================================

/// 单元格警告 (金额无法解析,已按 0 处理)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellWarning {
    pub row_number: usize,
    pub company_code: String,
    pub field: &'static str,
    pub raw_value: String,
}

/// 跳过的行
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SkippedRow {
    MissingCode { row_number: usize },
    DuplicateCode { row_number: usize, code: String },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseReport {
    pub records: Vec<CompanyRecord>,
    pub warnings: Vec<CellWarning>,
    pub skipped: Vec<SkippedRow>,
}

// ==========================================
// CompanySheetParser
// ==========================================
pub struct CompanySheetParser {
    file_parser: Box<dyn FileParser>,
    mapper: FieldMapper,
    cleaner: DataCleaner,
}

impl CompanySheetParser {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self::with_file_parser(mapping, Box::new(UniversalFileParser))
    }

    pub fn with_file_parser(mapping: ColumnMapping, file_parser: Box<dyn FileParser>) -> Self {
        Self {
            file_parser,
            mapper: FieldMapper::new(mapping),
            cleaner: DataCleaner,
        }
    }

    /// 解析单个源文件
    ///
    /// # 返回
    /// - Ok(ParseReport): 记录 + 单元格警告 + 跳过行
    /// - Err: 文件无法读取 / 无可识别表头
    pub fn parse(&self, path: &Path) -> ImportResult<ParseReport> {
        let sheet = self.file_parser.parse_to_raw_sheet(path)?;
        let header = self.mapper.locate_header(&sheet)?;
        debug!(path = %path.display(), header_row = header.header_row, "表头已定位");

        let mut report = ParseReport::default();
        let mut seen_codes: HashSet<String> = HashSet::new();

        for row in self.mapper.map_rows(&sheet, &header) {
            let Some(code) = row.code else {
                report.skipped.push(SkippedRow::MissingCode {
                    row_number: row.row_number,
                });
                continue;
            };

            if !seen_codes.insert(code.clone()) {
                warn!(row = row.row_number, code = %code, "重复的公司编码,保留首次出现的行");
                report.skipped.push(SkippedRow::DuplicateCode {
                    row_number: row.row_number,
                    code,
                });
                continue;
            }

            let contract_value = self.amount_or_zero(
                &row.contract_raw,
                row.row_number,
                &code,
                CompanyField::ContractValue,
                &mut report,
            );
            let spent_value = self.amount_or_zero(
                &row.spent_raw,
                row.row_number,
                &code,
                CompanyField::SpentValue,
                &mut report,
            );

            let name = row.name.unwrap_or_else(|| code.clone());
            report
                .records
                .push(CompanyRecord::new(code, name, contract_value, spent_value));
        }

        info!(
            path = %path.display(),
            records = report.records.len(),
            warnings = report.warnings.len(),
            skipped = report.skipped.len(),
            "表格解析完成"
        );

        Ok(report)
    }

    fn amount_or_zero(
        &self,
        raw: &RawCell,
        row_number: usize,
        code: &str,
        field: CompanyField,
        report: &mut ParseReport,
    ) -> f64 {
        match self.cleaner.parse_cell(raw) {
            CellValue::Amount(v) => v,
            CellValue::Blank => 0.0,
            CellValue::Malformed => {
                warn!(
                    row = row_number,
                    code = %code,
                    field = field.as_str(),
                    value = %raw,
                    "金额无法解析,按 0 处理"
                );
                report.warnings.push(CellWarning {
                    row_number,
                    company_code: code.to_string(),
                    field: field.as_str(),
                    raw_value: raw.to_string(),
                });
                0.0
            }
        }
    }
}
