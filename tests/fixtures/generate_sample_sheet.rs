// ==========================================
// 示例预算表生成器
// ==========================================
// 用途: 生成一份可放入监听目录的 CSV 预算表,便于手工验证看板
// 用法: generate_sample_sheet [输出路径] [行数]
// 默认: ./data/orcamento.csv, 20 行
// ==========================================

use chrono::Local;
use csv::WriterBuilder;
use std::error::Error;
use std::fs::{self, File};
use std::path::PathBuf;

// CSV 表头（默认列名）
const CSV_HEADER: &[&str] = &["Código", "Empresa", "Valor do Contrato", "Valor Gasto"];

const COMPANY_NAMES: &[&str] = &[
    "Alfa Engenharia",
    "Beta Serviços",
    "Gama Obras",
    "Delta Construções",
    "Épsilon Consultoria",
    "Zeta Manutenção",
    "Eta Logística",
    "Teta Elétrica",
];

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/orcamento.csv"));
    let rows: usize = match args.next() {
        Some(raw) => raw.parse()?,
        None => 20,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let file = File::create(&path)?;
    let mut wtr = WriterBuilder::new().delimiter(b';').from_writer(file);
    wtr.write_record(CSV_HEADER)?;

    // 以当前秒数为种子,重复运行时已花费金额会变化,触发监听器
    let seed = Local::now().timestamp() as u64;
    for i in 0..rows {
        let contract = 10_000.0 + (i as f64) * 2_500.0;
        // 覆盖 ok / warning / critical 三种状态
        let ratio = ((seed + i as u64 * 37) % 110) as f64 / 100.0;
        let spent = contract * ratio;
        let name = COMPANY_NAMES[i % COMPANY_NAMES.len()];

        wtr.write_record([
            format!("C{:03}", i + 1),
            format!("{} {}", name, i / COMPANY_NAMES.len() + 1),
            format_brl(contract),
            format_brl(spent),
        ])?;
    }
    wtr.flush()?;

    println!("✓ 生成 {} ({} 行)", path.display(), rows);
    Ok(())
}

/// 1234567.8 → "1.234.567,80"
fn format_brl(value: f64) -> String {
    let cents = (value * 100.0).round() as u64;
    let integer = (cents / 100).to_string();
    let mut grouped = String::new();
    for (i, c) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    format!("{},{:02}", grouped, cents % 100)
}
