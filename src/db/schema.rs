pub(crate) const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS expense (
    id       INTEGER PRIMARY KEY AUTOINCREMENT,
    amount   TEXT NOT NULL,
    category TEXT NOT NULL,
    date     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_expense_date ON expense(date);
CREATE INDEX IF NOT EXISTS idx_expense_category ON expense(category);

CREATE TABLE IF NOT EXISTS category (
    id        INTEGER PRIMARY KEY AUTOINCREMENT,
    name      TEXT NOT NULL UNIQUE,
    color     TEXT NOT NULL UNIQUE,
    is_active BOOLEAN NOT NULL DEFAULT 1
);
"#;

/// Table whose AUTOINCREMENT counter is kept past imported ids.
pub(crate) const EXPENSE_SEQUENCE: &str = "expense";
