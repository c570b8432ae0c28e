pub mod money;
pub mod report;
pub mod rules;
pub mod transaction;

pub use money::Money;
pub use report::{CategoryTotal, KnownSpending, Report, UnknownSpending};
pub use rules::{CategoryRule, Classification, RuleError, RuleTable, DEFAULT_RULES_TOML};
pub use transaction::Transaction;
