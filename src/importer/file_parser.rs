// ==========================================
// 预算看板系统 - 文件解析器实现
// ==========================================
// 职责: 源文件 → 原始单元格网格 (不做字段映射)
// 支持: Excel (.xlsx/.xls/.ods) / CSV (.csv, 自动识别 , 或 ; 分隔)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// ==========================================
// RawCell - 原始单元格
// ==========================================
/// Excel 数值单元格保留为 Number,不再经过文本金额解析
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
}

impl RawCell {
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            RawCell::Text(s) => Cow::Borrowed(s),
            RawCell::Number(v) => Cow::Owned(v.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RawCell::Text(s) if s.is_empty())
    }
}

impl Default for RawCell {
    fn default() -> Self {
        RawCell::Text(String::new())
    }
}

impl From<&str> for RawCell {
    fn from(value: &str) -> Self {
        RawCell::Text(value.trim().to_string())
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl From<&Data> for RawCell {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Float(v) => RawCell::Number(*v),
            Data::Int(v) => RawCell::Number(*v as f64),
            Data::Empty => RawCell::default(),
            other => RawCell::from(other.to_string().as_str()),
        }
    }
}

// ==========================================
// RawSheet - 原始网格
// ==========================================
/// 第一个工作表的所有行,完全空白的行保留以保持行号
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub rows: Vec<Vec<RawCell>>,
}

impl RawSheet {
    pub fn is_blank_row(row: &[RawCell]) -> bool {
        row.iter().all(RawCell::is_empty)
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件为原始网格
    ///
    /// # 返回
    /// - Ok(RawSheet): 网格
    /// - Err: 文件读取错误、格式错误
    fn parse_to_raw_sheet(&self, file_path: &Path) -> ImportResult<RawSheet>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 根据首个非空行猜测分隔符 (pt-BR 导出常用 ';')
    fn sniff_delimiter(path: &Path) -> ImportResult<u8> {
        let reader = BufReader::new(File::open(path)?);
        for line in reader.split(b'\n') {
            let line = line?;
            let text = String::from_utf8_lossy(&line);
            if text.trim().is_empty() {
                continue;
            }
            let semicolons = text.matches(';').count();
            let commas = text.matches(',').count();
            return Ok(if semicolons > commas { b';' } else { b',' });
        }
        Ok(b',')
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_sheet(&self, file_path: &Path) -> ImportResult<RawSheet> {
        let path = file_path;
        ensure_exists(path)?;

        let ext = extension_of(path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let delimiter = Self::sniff_delimiter(path)?;
        let file = File::open(path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(false) // 表头由上层定位
            .flexible(true) // 允许行长度不一致
            .delimiter(delimiter)
            .from_reader(file);

        let mut rows = Vec::new();
        for result in reader.byte_records() {
            let record = result?;
            // 非 UTF-8 (如 Latin-1) 的单元格做有损转换,不中断整个文件
            let row: Vec<RawCell> = record
                .iter()
                .map(|cell| RawCell::from(String::from_utf8_lossy(cell).as_ref()))
                .collect();
            rows.push(row);
        }

        Ok(RawSheet { rows })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_sheet(&self, file_path: &Path) -> ImportResult<RawSheet> {
        let path = file_path;
        ensure_exists(path)?;

        let ext = extension_of(path);
        if !matches!(ext.as_str(), "xlsx" | "xlsm" | "xls" | "ods") {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_names = workbook.sheet_names();
        let sheet_name = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook.worksheet_range(&sheet_name)?;

        let rows = range
            .rows()
            .map(|row| row.iter().map(RawCell::from).collect::<Vec<_>>())
            .collect();

        Ok(RawSheet { rows })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl FileParser for UniversalFileParser {
    fn parse_to_raw_sheet(&self, file_path: &Path) -> ImportResult<RawSheet> {
        match extension_of(file_path).as_str() {
            "csv" => CsvParser.parse_to_raw_sheet(file_path),
            "xlsx" | "xlsm" | "xls" | "ods" => ExcelParser.parse_to_raw_sheet(file_path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}
