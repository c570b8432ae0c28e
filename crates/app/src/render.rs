use serde::Serialize;
use std::io::{self, Write};
use tally_core::{Money, Report};

/// How amounts are printed and which unknowns are listed.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub threshold: Money,
    pub symbol: String,
    pub precision: u32,
}

impl RenderOptions {
    fn money(&self, amount: Money) -> String {
        amount.format(&self.symbol, self.precision)
    }
}

pub fn render_text<W: Write>(report: &Report, options: &RenderOptions, out: &mut W) -> io::Result<()> {
    writeln!(out, "Known total: {}", options.money(report.known.total))?;
    for category in report.known.sorted_by_total() {
        writeln!(out, "{} {}", options.money(category.total), category.name)?;
    }

    writeln!(out)?;
    writeln!(out, "Unknown transactions: {}", options.money(report.unknown.total))?;
    for tx in report.unknown.for_review(options.threshold) {
        writeln!(out, "{} {} {}", options.money(tx.amount), tx.display_date(), tx.text)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct JsonReport<'a> {
    known: JsonKnown<'a>,
    unknown: JsonUnknown<'a>,
}

#[derive(Serialize)]
struct JsonKnown<'a> {
    total: Money,
    categories: Vec<&'a tally_core::CategoryTotal>,
}

#[derive(Serialize)]
struct JsonUnknown<'a> {
    total: Money,
    count: usize,
    threshold: Money,
    review: Vec<&'a tally_core::Transaction>,
}

/// Same content as [`render_text`], with exact decimal strings.
pub fn render_json<W: Write>(report: &Report, options: &RenderOptions, out: &mut W) -> io::Result<()> {
    let doc = JsonReport {
        known: JsonKnown {
            total: report.known.total,
            categories: report.known.sorted_by_total(),
        },
        unknown: JsonUnknown {
            total: report.unknown.total,
            count: report.unknown.transactions.len(),
            threshold: options.threshold,
            review: report.unknown.for_review(options.threshold),
        },
    };
    serde_json::to_writer_pretty(&mut *out, &doc)?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{CategoryRule, RuleTable, Transaction};

    fn tx(day: u32, text: &str, amount: &str) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2021, 3, day).unwrap(),
            amount.parse().unwrap(),
            text,
        )
    }

    fn options() -> RenderOptions {
        RenderOptions {
            threshold: Money::from_cents(250_000),
            symbol: "₽".to_string(),
            precision: 0,
        }
    }

    fn sample_report() -> Report {
        let rules = RuleTable::new(vec![
            CategoryRule::new("junk food", ["MCDONALDS", "KFC"]),
            CategoryRule::new("taxi", ["YANDEX.TAXI"]),
        ])
        .unwrap();
        Report::build(
            &[
                tx(1, "MCDONALDS #1", "300"),
                tx(2, "YANDEX.TAXI", "1200"),
                tx(3, "RANDOM SHOP", "2500"),
                tx(4, "KFC YANDEX.TAXI", "2500.01"),
                tx(5, "FURNITURE", "15000"),
            ],
            &rules,
        )
    }

    fn render(report: &Report) -> String {
        let mut buf = Vec::new();
        render_text(report, &options(), &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn text_report_layout() {
        let expected = "\
Known total: ₽1,500
₽1,200 taxi
₽300 junk food

Unknown transactions: ₽20,000
₽15,000 2021.03.05 FURNITURE
₽2,500 2021.03.04 KFC YANDEX.TAXI
";
        assert_eq!(render(&sample_report()), expected);
    }

    #[test]
    fn empty_report_prints_both_headers() {
        assert_eq!(
            render(&Report::default()),
            "Known total: ₽0\n\nUnknown transactions: ₽0\n"
        );
    }

    #[test]
    fn json_report_contains_review_list() {
        let mut buf = Vec::new();
        render_json(&sample_report(), &options(), &mut buf).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();

        assert_eq!(value["known"]["total"], "1500");
        assert_eq!(value["known"]["categories"][0]["name"], "taxi");
        assert_eq!(value["unknown"]["count"], 3);
        assert_eq!(value["unknown"]["review"].as_array().unwrap().len(), 2);
        assert_eq!(value["unknown"]["review"][0]["text"], "FURNITURE");
        assert_eq!(value["unknown"]["review"][1]["amount"], "2500.01");
    }
}
