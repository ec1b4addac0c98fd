use rust_decimal::Decimal;
use thiserror::Error;

/// Rejections of direct user input. These are the only failures meant to
/// reach the caller; everything on the import/export path is logged instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Amount must be greater than 0 (got {0})")]
    NonPositiveAmount(Decimal),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Category '{0}' is inactive")]
    InactiveCategory(String),

    #[error("Category name must not be blank")]
    BlankCategoryName,

    #[error("Category already exists: {0}")]
    DuplicateCategory(String),

    #[error("Invalid color '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("Color {0} is already taken")]
    ColorTaken(String),
}

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("CSV file not found: {0}")]
    MissingFile(String),

    #[error("Could not decode {0} as UTF-8, UTF-8 with BOM or Latin-1")]
    Undecodable(String),

    #[error("Unexpected CSV columns: {0:?}")]
    UnexpectedHeaders(Vec<String>),
}
