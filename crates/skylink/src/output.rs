use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use skylink_decode::DecodedRecord;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
    #[serde(flatten)]
    record: &'a DecodedRecord,
}

/// Print one record as it arrives. `source` names the device it came from.
pub fn print_record(record: &DecodedRecord, source: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = RecordOutput { source, record };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => println!("{}", records_table(std::slice::from_ref(record))),
        OutputFormat::Pretty | OutputFormat::Raw => println!("{}", pretty_line(record, source)),
    }
}

/// Print a finished batch; tables get one shared header.
pub fn print_records(records: &[DecodedRecord], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if !records.is_empty() {
                println!("{}", records_table(records));
            }
        }
        _ => {
            for record in records {
                print_record(record, None, format);
            }
        }
    }
}

fn records_table(records: &[DecodedRecord]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ADDRESS", "BOARD", "PACKET", "RTR", "DATA"]);
    for record in records {
        table.add_row(vec![
            format!("0x{:03x}", record.address),
            record.board.clone(),
            record.name.clone(),
            record.rtr.to_string(),
            field_summary(record),
        ]);
    }
    table
}

fn pretty_line(record: &DecodedRecord, source: Option<&str>) -> String {
    let prefix = source.map(|s| format!("[{s}] ")).unwrap_or_default();
    let rtr = if record.rtr { " rtr" } else { "" };
    format!(
        "{prefix}0x{:03x} {}{rtr} {}",
        record.address,
        record.qualified_name(),
        field_summary(record)
    )
}

fn field_summary(record: &DecodedRecord) -> String {
    record
        .data
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse hex, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text
        .trim()
        .trim_start_matches("0x")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !digits.is_ascii() {
        return Err(format!("invalid hex in {text:?}"));
    }
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {text:?}"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte {:?}", &digits[i..i + 2]))
        })
        .collect()
}
