use serde::Serialize;
use std::collections::HashMap;

use crate::money::Money;
use crate::rules::RuleTable;
use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub name: String,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KnownSpending {
    pub total: Money,
    /// First-occurrence order; use [`KnownSpending::sorted_by_total`] for display.
    pub categories: Vec<CategoryTotal>,
}

impl KnownSpending {
    /// Largest total first.
    pub fn sorted_by_total(&self) -> Vec<&CategoryTotal> {
        let mut sorted: Vec<&CategoryTotal> = self.categories.iter().collect();
        sorted.sort_by(|a, b| b.total.cmp(&a.total));
        sorted
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnknownSpending {
    pub total: Money,
    /// Input order.
    pub transactions: Vec<Transaction>,
}

impl UnknownSpending {
    /// Transactions strictly above `threshold`, largest first. Everything
    /// below still counts towards `total`.
    pub fn for_review(&self, threshold: Money) -> Vec<&Transaction> {
        let mut review: Vec<&Transaction> = self
            .transactions
            .iter()
            .filter(|tx| tx.amount > threshold)
            .collect();
        review.sort_by(|a, b| b.amount.cmp(&a.amount));
        review
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub known: KnownSpending,
    pub unknown: UnknownSpending,
}

impl Report {
    /// Classifies every transaction and folds the amounts into per-category
    /// totals and the unknown bucket.
    pub fn build(transactions: &[Transaction], rules: &RuleTable) -> Self {
        let mut report = Report::default();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for tx in transactions {
            match rules.classify(&tx.text) {
                Some(name) => {
                    let slot = *index.entry(name).or_insert_with(|| {
                        report.known.categories.push(CategoryTotal {
                            name: name.to_string(),
                            total: Money::zero(),
                            count: 0,
                        });
                        report.known.categories.len() - 1
                    });
                    let entry = &mut report.known.categories[slot];
                    entry.total += tx.amount;
                    entry.count += 1;
                    report.known.total += tx.amount;
                }
                None => {
                    if tracing::enabled!(tracing::Level::DEBUG) {
                        let matched = rules.matched_categories(&tx.text);
                        if matched.len() > 1 {
                            tracing::debug!(text = %tx.text, categories = ?matched, "ambiguous transaction");
                        }
                    }
                    report.unknown.total += tx.amount;
                    report.unknown.transactions.push(tx.clone());
                }
            }
        }

        tracing::debug!(
            known = report.known.categories.iter().map(|c| c.count).sum::<usize>(),
            unknown = report.unknown.transactions.len(),
            "report built"
        );
        report
    }

    pub fn grand_total(&self) -> Money {
        self.known.total + self.unknown.total
    }
}
