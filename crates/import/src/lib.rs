pub mod statement;

pub use statement::{
    detect_delimiter, load_statement, load_statement_file, parse_amount, parse_packed_date,
    StatementError, StatementLoader, StatementProfile, AUTO_DELIMITER,
};
