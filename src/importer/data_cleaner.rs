// ==========================================
// 预算看板系统 - 数据清洗器实现
// ==========================================
// 职责: 表头标准化 / 区域容错的金额解析
// 说明: 金额解析失败不报错,由调用方记录警告并按 0 处理
// ==========================================

use crate::importer::file_parser::RawCell;

pub struct DataCleaner;

/// 金额单元格解析结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue {
    /// 空单元格
    Blank,
    /// 合法的非负金额
    Amount(f64),
    /// 无法解析 (或为负数)
    Malformed,
}

impl DataCleaner {
    /// 标准化表头: 去首尾空白、小写、去掉葡语重音、合并连续空白
    pub fn normalize_header(&self, value: &str) -> String {
        let folded: String = value
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| match c {
                'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
                'é' | 'è' | 'ê' | 'ë' => 'e',
                'í' | 'ì' | 'î' | 'ï' => 'i',
                'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
                'ú' | 'ù' | 'û' | 'ü' => 'u',
                'ç' => 'c',
                '_' => ' ',
                other => other,
            })
            .collect();
        folded.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// 区域容错的金额解析
    ///
    /// 支持:
    /// - `1234.56` / `1,234.56` (点为小数点)
    /// - `1234,56` / `1.234,56` (逗号为小数点, pt-BR)
    /// - 货币符号 `R$` / `$` / `€` 与空白
    /// - 括号负数 `(10,00)`
    ///
    /// 只有一个分隔符且只出现一次时: 其后恰为三位数字、整数部分为 1~3 位且不以 0 开头
    /// 视为千分位 (`1.500` / `1,500` → 1500),否则视为小数点
    pub fn parse_amount(&self, raw: &str) -> CellValue {
        let mut text: String = raw
            .trim()
            .replace("R$", "")
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '$' && *c != '€' && *c != '\u{a0}')
            .collect();

        if text.is_empty() || text == "-" {
            return CellValue::Blank;
        }

        let mut negative = false;
        if text.starts_with('(') && text.ends_with(')') && text.len() > 2 {
            negative = true;
            text = text[1..text.len() - 1].to_string();
        }
        if let Some(rest) = text.strip_prefix('-') {
            negative = true;
            text = rest.to_string();
        }

        let normalized = match (text.rfind('.'), text.rfind(',')) {
            (Some(dot), Some(comma)) => {
                if comma > dot {
                    // 1.234,56
                    text.replace('.', "").replace(',', ".")
                } else {
                    // 1,234.56
                    text.replace(',', "")
                }
            }
            (None, Some(_)) => {
                if text.matches(',').count() == 1 && !is_thousands_group(&text, ',') {
                    text.replace(',', ".")
                } else {
                    text.replace(',', "")
                }
            }
            (Some(_), None) => {
                if text.matches('.').count() == 1 && !is_thousands_group(&text, '.') {
                    text
                } else {
                    text.replace('.', "")
                }
            }
            (None, None) => text,
        };

        match normalized.parse::<f64>() {
            Ok(v) if v.is_finite() && !negative => CellValue::Amount(v),
            Ok(v) if v.is_finite() && v == 0.0 => CellValue::Amount(0.0),
            _ => CellValue::Malformed,
        }
    }

    /// 解析原始单元格: 数值单元格直接取值,文本单元格走区域容错解析
    pub fn parse_cell(&self, cell: &RawCell) -> CellValue {
        match cell {
            RawCell::Number(v) if v.is_finite() && *v >= 0.0 => CellValue::Amount(*v),
            RawCell::Number(_) => CellValue::Malformed,
            RawCell::Text(text) => self.parse_amount(text),
        }
    }

    /// 清洗文本单元格 (去空白, 空串 → None)
    pub fn normalize_text(&self, value: Option<&str>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }
}

/// `1.500` 形式: 唯一分隔符之后恰为三位数字
fn is_thousands_group(text: &str, sep: char) -> bool {
    let Some((int_part, frac_part)) = text.split_once(sep) else {
        return false;
    };
    (1..=3).contains(&int_part.len())
        && !int_part.starts_with('0')
        && int_part.chars().all(|c| c.is_ascii_digit())
        && frac_part.len() == 3
        && frac_part.chars().all(|c| c.is_ascii_digit())
}
