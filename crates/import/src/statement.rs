use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tally_core::{Money, Transaction};
use thiserror::Error;

pub const AUTO_DELIMITER: &str = "auto";

const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'|', b'\t'];

/// Column layout of a delimited statement export. Defaults describe the
/// Avangard account statement (`AccStat.csv`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatementProfile {
    pub name: String,
    pub date_column: usize,
    pub amount_column: usize,
    pub currency_column: usize,
    pub description_column: usize,
    /// Only rows in this currency are kept.
    pub currency: String,
    /// A single character, or `"auto"` to pick one of `,` `;` `|` tab from
    /// the first non-blank line.
    pub delimiter: String,
    pub has_header: bool,
}

impl Default for StatementProfile {
    fn default() -> Self {
        Self {
            name: "Avangard".to_string(),
            date_column: 4,
            amount_column: 6,
            currency_column: 7,
            description_column: 9,
            currency: "RUR".to_string(),
            delimiter: AUTO_DELIMITER.to_string(),
            has_header: false,
        }
    }
}

#[derive(Error, Debug)]
pub enum StatementError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Line {line}: missing {field} column {column}")]
    MissingColumn {
        line: u64,
        field: &'static str,
        column: usize,
    },
    #[error("Line {line}: invalid date '{value}'")]
    InvalidDate { line: u64, value: String },
    #[error("Line {line}: invalid amount '{value}'")]
    InvalidAmount { line: u64, value: String },
    #[error("Invalid delimiter '{0}': expected one character or \"auto\"")]
    InvalidDelimiter(String),
}

/// First candidate separator on the first non-blank line; `,` if none.
pub fn detect_delimiter(data: &str) -> u8 {
    data.lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| line.bytes().find(|b| DELIMITER_CANDIDATES.contains(b)))
        .unwrap_or(b',')
}

fn resolve_delimiter(profile: &StatementProfile, data: &str) -> Result<u8, StatementError> {
    match profile.delimiter.as_str() {
        AUTO_DELIMITER => Ok(detect_delimiter(data)),
        d if d.len() == 1 => Ok(d.as_bytes()[0]),
        other => Err(StatementError::InvalidDelimiter(other.to_string())),
    }
}

/// Parses the packed `dd.MM.yyyy hh:mm` field: day at offsets 0-1, month at
/// 3-4, year at 6-9. Separators and the trailing time are not inspected.
pub fn parse_packed_date(s: &str) -> Option<NaiveDate> {
    let bytes = s.trim().as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    let number = |range: std::ops::Range<usize>| -> Option<u32> {
        let digits = &bytes[range];
        if !digits.iter().all(u8::is_ascii_digit) {
            return None;
        }
        digits
            .iter()
            .try_fold(0u32, |acc, d| acc.checked_mul(10)?.checked_add(u32::from(d - b'0')))
    };
    let day = number(0..2)?;
    let month = number(3..5)?;
    let year = number(6..10)?;
    NaiveDate::from_ymd_opt(year as i32, month, day)
}

pub fn parse_amount(s: &str) -> Option<Money> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.parse().ok()
}

pub struct StatementLoader<'a> {
    profile: &'a StatementProfile,
}

impl<'a> StatementLoader<'a> {
    pub fn new(profile: &'a StatementProfile) -> Self {
        Self { profile }
    }

    /// Reads every record, failing on the first malformed row. Rows in another
    /// currency or with a non-positive amount are dropped.
    pub fn load<R: Read>(&self, reader: &mut csv::Reader<R>) -> Result<Vec<Transaction>, StatementError> {
        let profile = self.profile;
        let mut transactions = Vec::new();
        let mut dropped = 0usize;

        for result in reader.records() {
            let record = result?;

            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            let line = record.position().map_or(0, |p| p.line());
            let field = |column: usize, name: &'static str| {
                record.get(column).ok_or(StatementError::MissingColumn {
                    line,
                    field: name,
                    column,
                })
            };

            let raw_date = field(profile.date_column, "date")?;
            let raw_amount = field(profile.amount_column, "amount")?;
            let currency = field(profile.currency_column, "currency")?;
            let text = field(profile.description_column, "description")?;

            let date = parse_packed_date(raw_date).ok_or_else(|| StatementError::InvalidDate {
                line,
                value: raw_date.to_string(),
            })?;
            let amount = parse_amount(raw_amount).ok_or_else(|| StatementError::InvalidAmount {
                line,
                value: raw_amount.to_string(),
            })?;

            if currency.trim() != profile.currency || !amount.is_positive() {
                dropped += 1;
                continue;
            }

            transactions.push(Transaction::new(date, amount, text));
        }

        tracing::debug!(
            profile = %profile.name,
            kept = transactions.len(),
            dropped,
            "statement loaded"
        );
        Ok(transactions)
    }
}

fn reader_builder(profile: &StatementProfile, delimiter: u8) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(profile.has_header)
        .delimiter(delimiter)
        .flexible(true);
    builder
}

/// The whole export is read into memory first so the delimiter can be
/// detected before parsing.
pub fn load_statement<R: Read>(
    mut data: R,
    profile: &StatementProfile,
) -> Result<Vec<Transaction>, StatementError> {
    let mut text = String::new();
    data.read_to_string(&mut text)?;
    let delimiter = resolve_delimiter(profile, &text)?;
    tracing::debug!(delimiter = %char::from(delimiter).escape_default(), "using delimiter");
    let mut reader = reader_builder(profile, delimiter).from_reader(text.as_bytes());
    StatementLoader::new(profile).load(&mut reader)
}

pub fn load_statement_file(
    path: &Path,
    profile: &StatementProfile,
) -> Result<Vec<Transaction>, StatementError> {
    let file = File::open(path)?;
    load_statement(file, profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(s: &str) -> Money {
        s.parse().unwrap()
    }

    fn row(date: &str, amount: &str, currency: &str, text: &str) -> String {
        format!("a,b,c,d,{date},f,{amount},{currency},i,{text}\n")
    }

    // ── parse_packed_date ─────────────────────────────────────────────────────

    #[test]
    fn packed_date_with_time() {
        assert_eq!(
            parse_packed_date("07.03.2021 14:55"),
            NaiveDate::from_ymd_opt(2021, 3, 7)
        );
    }

    #[test]
    fn packed_date_exactly_ten_chars() {
        assert_eq!(
            parse_packed_date("31.12.2020"),
            NaiveDate::from_ymd_opt(2020, 12, 31)
        );
    }

    #[test]
    fn packed_date_ignores_separator_characters() {
        assert_eq!(
            parse_packed_date("01/02/2021"),
            NaiveDate::from_ymd_opt(2021, 2, 1)
        );
    }

    #[test]
    fn packed_date_too_short() {
        assert_eq!(parse_packed_date("07.03.21"), None);
        assert_eq!(parse_packed_date(""), None);
    }

    #[test]
    fn packed_date_non_digits() {
        assert_eq!(parse_packed_date("0x.03.2021"), None);
    }

    #[test]
    fn packed_date_impossible_calendar_date() {
        assert_eq!(parse_packed_date("30.02.2021"), None);
        assert_eq!(parse_packed_date("01.13.2021"), None);
    }

    #[test]
    fn packed_date_multibyte_input_does_not_panic() {
        assert_eq!(parse_packed_date("дата платежа"), None);
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_plain() {
        assert_eq!(parse_amount("123.45"), Some(m("123.45")));
    }

    #[test]
    fn parse_amount_negative() {
        assert_eq!(parse_amount("-50.00"), Some(m("-50")));
    }

    #[test]
    fn parse_amount_tolerates_whitespace() {
        assert_eq!(parse_amount(" 2 500.01 "), Some(m("2500.01")));
    }

    #[test]
    fn parse_amount_invalid() {
        assert_eq!(parse_amount("abc"), None);
        assert_eq!(parse_amount(""), None);
    }

    // ── load_statement ────────────────────────────────────────────────────────

    #[test]
    fn keeps_positive_home_currency_rows() {
        let data = [
            row("07.03.2021 14:55", "300.50", "RUR", "MCDONALDS #1"),
            row("08.03.2021 09:00", "-1000", "RUR", "REFUND"),
            row("09.03.2021 10:00", "20", "USD", "NETFLIX"),
            row("10.03.2021 11:00", "0", "RUR", "ZERO"),
        ]
        .concat();
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].text, "MCDONALDS #1");
        assert_eq!(txs[0].amount, m("300.50"));
        assert_eq!(txs[0].display_date(), "2021.03.07");
    }

    #[test]
    fn preserves_input_order() {
        let data = [
            row("01.01.2021 00:00", "3", "RUR", "C"),
            row("01.01.2021 00:00", "1", "RUR", "A"),
            row("01.01.2021 00:00", "2", "RUR", "B"),
        ]
        .concat();
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        let texts: Vec<&str> = txs.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, ["C", "A", "B"]);
    }

    #[test]
    fn quoted_description_with_delimiter() {
        let data = "a,b,c,d,01.06.2021 12:00,f,99.90,RUR,i,\"SHOP, MOSCOW\"\n";
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        assert_eq!(txs[0].text, "SHOP, MOSCOW");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let data = format!("\n{}\n", row("01.01.2021 00:00", "1", "RUR", "A"));
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[test]
    fn short_row_fails_whole_load() {
        let data = format!("{}a,b,c\n", row("01.01.2021 00:00", "1", "RUR", "A"));
        let err = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap_err();
        assert!(matches!(
            err,
            StatementError::MissingColumn { line: 2, .. }
        ));
    }

    #[test]
    fn bad_amount_fails_whole_load() {
        let data = row("01.01.2021 00:00", "12.5x", "RUR", "A");
        let err = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap_err();
        assert!(matches!(err, StatementError::InvalidAmount { line: 1, .. }));
    }

    #[test]
    fn bad_date_fails_even_for_foreign_currency() {
        let data = row("1.1.21", "5", "USD", "A");
        let err = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap_err();
        assert!(matches!(err, StatementError::InvalidDate { .. }));
    }

    #[test]
    fn custom_profile_semicolon_with_header() {
        let profile = StatementProfile {
            name: "test".to_string(),
            date_column: 0,
            amount_column: 1,
            currency_column: 2,
            description_column: 3,
            currency: "EUR".to_string(),
            delimiter: ";".to_string(),
            has_header: true,
        };
        let data = "date;amount;currency;text\n15.01.2024 08:30;49.99;EUR;BOOKING.COM\n";
        let txs = load_statement(data.as_bytes(), &profile).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].amount, m("49.99"));
    }

    // ── delimiter ─────────────────────────────────────────────────────────────

    #[test]
    fn detect_delimiter_picks_first_separator() {
        assert_eq!(detect_delimiter("a;b,c\n"), b';');
        assert_eq!(detect_delimiter("\n\n  \na\tb\n"), b'\t');
        assert_eq!(detect_delimiter("a|b|c"), b'|');
        assert_eq!(detect_delimiter("no separators"), b',');
        assert_eq!(detect_delimiter(""), b',');
    }

    #[test]
    fn semicolon_export_loads_with_default_profile() {
        let data = "40817810000000000001;Card;*1234;Purchase;07.03.2021 14:55;09.03.2021;300.00;RUR;300.00;MCDONALDS #1\n";
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].text, "MCDONALDS #1");
        assert_eq!(txs[0].amount, m("300"));
    }

    #[test]
    fn tab_export_loads_with_default_profile() {
        let data = "a\tb\tc\td\t08.03.2021 10:00\tf\t1000.50\tRUR\ti\tRANDOM SHOP, MOSCOW\n";
        let txs = load_statement(data.as_bytes(), &StatementProfile::default()).unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].text, "RANDOM SHOP, MOSCOW");
        assert_eq!(txs[0].display_date(), "2021.03.08");
    }

    #[test]
    fn explicit_delimiter_overrides_detection() {
        let profile = StatementProfile {
            delimiter: ",".to_string(),
            ..StatementProfile::default()
        };
        let data = "a;b;c;d;07.03.2021 14:55;f;300.00;RUR;i;KFC\n";
        let err = load_statement(data.as_bytes(), &profile).unwrap_err();
        assert!(matches!(err, StatementError::MissingColumn { line: 1, .. }));
    }

    #[test]
    fn multi_character_delimiter_is_rejected() {
        let profile = StatementProfile {
            delimiter: ";;".to_string(),
            ..StatementProfile::default()
        };
        let err = load_statement(row("01.01.2021 00:00", "1", "RUR", "A").as_bytes(), &profile)
            .unwrap_err();
        assert!(matches!(err, StatementError::InvalidDelimiter(d) if d == ";;"));
    }

    #[test]
    fn load_statement_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("AccStat.csv");
        std::fs::write(&path, row("02.02.2022 10:10", "150", "RUR", "KFC")).unwrap();
        let txs = load_statement_file(&path, &StatementProfile::default()).unwrap();
        assert_eq!(txs[0].text, "KFC");
    }

    #[test]
    fn load_statement_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_statement_file(&dir.path().join("nope.csv"), &StatementProfile::default())
            .unwrap_err();
        assert!(matches!(err, StatementError::IoError(_)));
    }
}
