use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::money::Money;

/// A normalized expense row. Loaders only emit rows with a positive amount
/// in the home currency; the classifier reads `text` and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Money,
    pub text: String,
}

impl Transaction {
    pub fn new(date: NaiveDate, amount: Money, text: impl Into<String>) -> Self {
        Transaction {
            date,
            amount,
            text: text.into(),
        }
    }

    /// `yyyy.MM.dd`, the form used in printed reports.
    pub fn display_date(&self) -> String {
        self.date.format("%Y.%m.%d").to_string()
    }
}
