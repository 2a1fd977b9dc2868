// ==========================================
// 预算看板系统 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 瞬时读取失败 (下次轮询重试) / 结构性解析失败 (本周期放弃)
// ==========================================

use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件不存在: {0}")]
    FileNotFound(String),

    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 结构错误 =====
    #[error("无法识别表头: 缺少必需列 {missing:?}")]
    HeaderNotRecognized { missing: Vec<String> },

    #[error("文件无数据行: {0}")]
    EmptySheet(String),
}

impl ImportError {
    /// 是否为瞬时错误 (文件被占用/写入中),应在下一个轮询周期重试
    ///
    /// 文件不存在也视为瞬时: 写入方常以 "删除 + 重建" 的方式替换文件
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ImportError::FileReadError(_) | ImportError::FileNotFound(_)
        )
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => ImportError::FileReadError(err.to_string()),
            _ => ImportError::CsvParseError(err.to_string()),
        }
    }
}

// 实现 From<calamine::Error>
// open_workbook_auto 把打开失败包装在 Xlsx/Xls/Ods 及 zip 的 Io 变体中,沿 source 链查找
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        if caused_by_io(&err) {
            ImportError::FileReadError(err.to_string())
        } else {
            ImportError::ExcelParseError(err.to_string())
        }
    }
}

fn caused_by_io(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<std::io::Error>() {
            return true;
        }
        current = e.source();
    }
    false
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
