// ==========================================
// CompanySheetParser 集成测试
// ==========================================
// 测试目标: 验证完整的表格解析流程 (CSV 文件 → ParseReport)
// ==========================================

mod test_helpers;

use budget_dashboard::config::ColumnMapping;
use budget_dashboard::domain::BudgetStatus;
use budget_dashboard::engine::compute_statistics;
use budget_dashboard::importer::{CompanySheetParser, ImportError, SkippedRow};
use budget_dashboard::logging;
use std::path::PathBuf;
use tempfile::TempDir;
use test_helpers::{write_raw, write_sheet};

fn parser() -> CompanySheetParser {
    CompanySheetParser::new(ColumnMapping::default())
}

#[test]
fn test_parse_locale_formatted_sheet() {
    logging::init_test();
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        dir.path(),
        "orcamento.csv",
        &[
            ("C001", "Alfa Engenharia", "R$ 1.000,00", "250,50"),
            ("C002", "Beta Serviços", "2.000,00", "1.850,00"),
            ("C003", "Gama Obras", "500.00", "400"),
        ],
    );

    let report = parser().parse(&path).unwrap();

    assert!(report.warnings.is_empty());
    assert_eq!(report.records.len(), 3);
    let alfa = &report.records[0];
    assert_eq!(alfa.code, "C001");
    assert_eq!(alfa.name, "Alfa Engenharia");
    assert_eq!(alfa.contract_value, 1000.0);
    assert_eq!(alfa.spent_value, 250.5);
    assert_eq!(alfa.percentage, 25.05);
    assert_eq!(report.records[1].status, BudgetStatus::Critical);
    assert_eq!(report.records[2].status, BudgetStatus::Warning);
}

#[test]
fn test_malformed_cell_defaults_to_zero() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        dir.path(),
        "orcamento.csv",
        &[
            ("C001", "Alfa", "1000", "n/d"),
            ("C002", "Beta", "1000", "100"),
        ],
    );

    let report = parser().parse(&path).unwrap();

    assert_eq!(report.records.len(), 2);
    assert_eq!(report.records[0].spent_value, 0.0);
    assert_eq!(report.records[1].spent_value, 100.0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].company_code, "C001");
    assert_eq!(report.warnings[0].raw_value, "n/d");
}

#[test]
fn test_rows_without_code_are_skipped() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        dir.path(),
        "orcamento.csv",
        &[
            ("C001", "Alfa", "100", "10"),
            ("", "Sem Código", "100", "10"),
            ("C001", "Alfa Duplicada", "999", "999"),
            ("C002", "Beta", "100", "10"),
        ],
    );

    let report = parser().parse(&path).unwrap();

    let codes: Vec<&str> = report.records.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["C001", "C002"]);
    assert_eq!(report.records[0].name, "Alfa");
    assert!(matches!(report.skipped[0], SkippedRow::MissingCode { .. }));
    assert!(matches!(report.skipped[1], SkippedRow::DuplicateCode { .. }));
}

#[test]
fn test_header_found_below_title_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_raw(
        dir.path(),
        "orcamento.csv",
        "Relatório de Contratos;;;\n\
         Atualizado em 01/03/2026;;;\n\
         ;;;\n\
         Código;Empresa;Valor do Contrato;Valor Gasto\n\
         C010;Delta;300;30\n",
    );

    let report = parser().parse(&path).unwrap();

    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].code, "C010");
    assert_eq!(report.records[0].percentage, 10.0);
}

#[test]
fn test_unrecognized_header_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = write_raw(
        dir.path(),
        "orcamento.csv",
        "Código;Empresa;Valor do Contrato\nC001;Alfa;100\n",
    );

    let err = parser().parse(&path).unwrap_err();

    match err {
        ImportError::HeaderNotRecognized { missing } => {
            assert_eq!(missing, vec!["spent_value".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_missing_file_is_transient() {
    let dir = TempDir::new().unwrap();
    let err = parser().parse(&dir.path().join("nao_existe.csv")).unwrap_err();
    assert!(err.is_transient());
}

fn xlsx_fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/orcamento_sample.xlsx")
}

#[test]
fn test_parse_xlsx_workbook_first_sheet() {
    let report = parser().parse(&xlsx_fixture()).unwrap();

    // 第二个工作表 (Rascunho) 不参与解析
    let codes: Vec<&str> = report.records.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["C001", "1002", "C003", "C004"]);

    let alfa = &report.records[0];
    assert_eq!(alfa.contract_value, 1000.0);
    assert_eq!(alfa.spent_value, 250.5);
    assert_eq!(alfa.percentage, 25.05);
    assert_eq!(alfa.status, BudgetStatus::Ok);

    // 数值单元格不经过文本千分位规则
    assert_eq!(report.records[1].contract_value, 1.234);
    assert_eq!(report.records[1].status, BudgetStatus::Warning);

    // 文本金额按 pt-BR 解析,坏单元格按 0 处理
    let gama = &report.records[2];
    assert_eq!(gama.contract_value, 1500.0);
    assert_eq!(gama.spent_value, 0.0);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].company_code, "C003");
    assert_eq!(report.warnings[0].raw_value, "n/d");
    assert_eq!(report.warnings[0].row_number, 6);

    assert_eq!(report.records[3].status, BudgetStatus::Critical);
}

#[test]
fn test_lone_thousands_separator_in_csv() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        dir.path(),
        "orcamento.csv",
        &[("C001", "Alfa", "R$ 1.000", "1.500"), ("C002", "Beta", "2,000", "150")],
    );

    let report = parser().parse(&path).unwrap();

    assert_eq!(report.records[0].contract_value, 1000.0);
    assert_eq!(report.records[0].spent_value, 1500.0);
    assert_eq!(report.records[0].status, BudgetStatus::Critical);
    assert_eq!(report.records[1].contract_value, 2000.0);
    assert_eq!(report.records[1].percentage, 7.5);
}

#[test]
fn test_statistics_from_parsed_records() {
    let dir = TempDir::new().unwrap();
    let path = write_sheet(
        dir.path(),
        "orcamento.csv",
        &[
            ("A", "A", "100", "50"),
            ("B", "B", "100", "80"),
            ("C", "C", "200", "190"),
        ],
    );

    let report = parser().parse(&path).unwrap();
    let stats = compute_statistics(&report.records);

    assert_eq!(stats.total_companies, 3);
    assert_eq!(stats.total_contract_value, 400.0);
    assert_eq!(stats.total_spent_value, 320.0);
    assert_eq!(stats.overall_percentage, 80.0);
    assert_eq!((stats.ok_count, stats.warning_count, stats.critical_count), (1, 1, 1));
}
