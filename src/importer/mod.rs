// ==========================================
// 预算看板系统 - 导入层
// ==========================================
// 职责: 外部表格 → 公司预算记录
// 支持: Excel, CSV
// ==========================================

// 模块声明
pub mod company_parser;
pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use company_parser::{CellWarning, CompanySheetParser, ParseReport, SkippedRow};
pub use data_cleaner::{CellValue, DataCleaner};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{FieldMapper, HeaderIndex, MappedRow};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawCell, RawSheet, UniversalFileParser};
