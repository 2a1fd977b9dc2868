// ==========================================
// 预算看板系统 - 字段映射器实现
// ==========================================
// 职责: 定位表头行 → 源列到标准字段映射 → 行记录提取
// ==========================================

use crate::config::column_mapping::{ColumnMapping, CompanyField};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{RawCell, RawSheet};
use std::collections::HashMap;

/// 表头搜索深度 (允许表头之前存在标题行)
pub const HEADER_SEARCH_ROWS: usize = 10;

// ==========================================
// HeaderIndex - 已识别的表头
// ==========================================
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    /// 表头所在行 (0 起)
    pub header_row: usize,
    columns: HashMap<CompanyField, usize>,
}

impl HeaderIndex {
    pub fn column(&self, field: CompanyField) -> Option<usize> {
        self.columns.get(&field).copied()
    }
}

// ==========================================
// MappedRow - 映射后的行 (金额尚未解析)
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct MappedRow {
    pub row_number: usize, // 1 起,与表格软件显示一致
    pub code: Option<String>,
    pub name: Option<String>,
    pub contract_raw: RawCell,
    pub spent_raw: RawCell,
}

pub struct FieldMapper {
    mapping: ColumnMapping,
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new(mapping: ColumnMapping) -> Self {
        Self {
            mapping,
            cleaner: DataCleaner,
        }
    }

    /// 在前 HEADER_SEARCH_ROWS 行中查找包含全部必需列的表头行
    ///
    /// # 返回
    /// - Ok(HeaderIndex)
    /// - Err(HeaderNotRecognized): 缺失列取自匹配最多的候选行
    pub fn locate_header(&self, sheet: &RawSheet) -> ImportResult<HeaderIndex> {
        let mut best_missing: Option<Vec<String>> = None;

        for (row_idx, row) in sheet.rows.iter().take(HEADER_SEARCH_ROWS).enumerate() {
            if RawSheet::is_blank_row(row) {
                continue;
            }
            let columns = self.match_columns(row);
            let missing: Vec<String> = CompanyField::required()
                .iter()
                .filter(|f| !columns.contains_key(f))
                .map(|f| f.as_str().to_string())
                .collect();

            if missing.is_empty() {
                return Ok(HeaderIndex {
                    header_row: row_idx,
                    columns,
                });
            }

            let better = best_missing
                .as_ref()
                .map(|best| missing.len() < best.len())
                .unwrap_or(true);
            if better {
                best_missing = Some(missing);
            }
        }

        if sheet.rows.iter().all(|r| RawSheet::is_blank_row(r)) {
            return Err(ImportError::EmptySheet("表格为空".to_string()));
        }

        Err(ImportError::HeaderNotRecognized {
            missing: best_missing.unwrap_or_else(|| {
                CompanyField::required()
                    .iter()
                    .map(|f| f.as_str().to_string())
                    .collect()
            }),
        })
    }

    fn match_columns(&self, row: &[RawCell]) -> HashMap<CompanyField, usize> {
        let normalized: Vec<String> = row
            .iter()
            .map(|cell| self.cleaner.normalize_header(&cell.text()))
            .collect();

        let mut columns = HashMap::new();
        for field in [
            CompanyField::Code,
            CompanyField::Name,
            CompanyField::ContractValue,
            CompanyField::SpentValue,
        ] {
            // 别名顺序即优先级
            let found = self.mapping.aliases(field).iter().find_map(|alias| {
                let alias = self.cleaner.normalize_header(alias);
                normalized.iter().position(|h| *h == alias)
            });
            if let Some(col) = found {
                columns.insert(field, col);
            }
        }
        columns
    }

    /// 将表头之后的数据行映射为 MappedRow (完全空白的行跳过)
    pub fn map_rows(&self, sheet: &RawSheet, header: &HeaderIndex) -> Vec<MappedRow> {
        let cell = |row: &[RawCell], field: CompanyField| -> Option<RawCell> {
            header.column(field).and_then(|col| row.get(col)).cloned()
        };
        let text = |row: &[RawCell], field: CompanyField| -> Option<String> {
            cell(row, field).map(|v| v.to_string())
        };

        sheet
            .rows
            .iter()
            .enumerate()
            .skip(header.header_row + 1)
            .filter(|(_, row)| !RawSheet::is_blank_row(row))
            .map(|(idx, row)| MappedRow {
                row_number: idx + 1,
                code: self.cleaner.normalize_text(text(row, CompanyField::Code).as_deref()),
                name: self.cleaner.normalize_text(text(row, CompanyField::Name).as_deref()),
                contract_raw: cell(row, CompanyField::ContractValue).unwrap_or_default(),
                spent_raw: cell(row, CompanyField::SpentValue).unwrap_or_default(),
            })
            .collect()
    }
}
