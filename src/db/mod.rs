mod schema;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

use crate::config::StorageEngine;
use crate::error::ValidationError;
use crate::models::palette::{self, PRESET_COLORS};
use crate::models::*;

/// Outcome of writing one expense by identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Upserted {
    Inserted,
    Updated,
}

/// Typed expense operations the reconciler relies on. Implemented by
/// [`Store`], which works the same inside and outside a transaction.
pub(crate) trait ExpenseRepository {
    fn find_by_id(&self, id: i64) -> Result<Option<Expense>>;

    /// Insert with the expense's own id, or overwrite amount/category/date of
    /// the row that already has it. No amount or category checks.
    fn upsert(&self, expense: &Expense) -> Result<Upserted>;

    fn delete_by_category(&self, category: &str) -> Result<usize>;

    /// Totals per category, largest first. `month` is `YYYY-MM`.
    fn sum_by_category(&self, month: Option<&str>) -> Result<Vec<(String, Decimal)>>;
}

pub(crate) struct Database {
    conn: Connection,
    in_memory: bool,
}

/// Borrowed handle over either the plain connection or an open transaction.
pub(crate) struct Store<'c> {
    conn: &'c Connection,
}

impl Database {
    pub(crate) fn connect(engine: &StorageEngine) -> Result<Self> {
        match engine {
            StorageEngine::InMemory => Self::open_in_memory(),
            StorageEngine::File(path) => Self::open(path),
        }
    }

    pub(crate) fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")
            .context("Failed to set database pragmas")?;
        let db = Self {
            conn,
            in_memory: false,
        };
        db.init().context("Database initialisation failed")?;
        Ok(db)
    }

    pub(crate) fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            in_memory: true,
        };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        self.seed_default_categories()
    }

    fn seed_default_categories(&self) -> Result<()> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))?;
        if count > 0 {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        for (name, color) in PRESET_COLORS {
            tx.execute(
                "INSERT OR IGNORE INTO category (name, color, is_active) VALUES (?1, ?2, 1)",
                params![name, color],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub(crate) fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    pub(crate) fn store(&self) -> Store<'_> {
        Store { conn: &self.conn }
    }

    /// Run `f` inside one transaction. Commits when `f` returns `Ok`; any
    /// error rolls back everything `f` wrote.
    pub(crate) fn atomic<T>(&mut self, f: impl FnOnce(&Store<'_>) -> Result<T>) -> Result<T> {
        let tx = self.conn.transaction()?;
        let out = f(&Store { conn: &tx })?;
        tx.commit()?;
        Ok(out)
    }

    // ── Expenses ──────────────────────────────────────────────

    /// Validated constructor used for direct user input.
    pub(crate) fn create_expense(
        &self,
        amount: Decimal,
        category: &str,
        date: Option<NaiveDate>,
    ) -> Result<Expense> {
        ensure_positive(amount)?;
        self.ensure_usable_category(category)?;
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

        self.conn.execute(
            "INSERT INTO expense (amount, category, date) VALUES (?1, ?2, ?3)",
            params![amount.to_string(), category, date],
        )?;
        Ok(Expense {
            id: Some(self.conn.last_insert_rowid()),
            amount,
            category: category.to_string(),
            date,
        })
    }

    /// Newest first.
    pub(crate) fn get_expenses(&self) -> Result<Vec<Expense>> {
        self.query_expenses("SELECT id, amount, category, date FROM expense ORDER BY date DESC, id DESC")
    }

    /// Oldest first, the order the CSV backup is written in.
    pub(crate) fn get_expenses_for_export(&self) -> Result<Vec<Expense>> {
        self.query_expenses("SELECT id, amount, category, date FROM expense ORDER BY date ASC, id ASC")
    }

    fn query_expenses(&self, sql: &str) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], expense_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn find_by_id(&self, id: i64) -> Result<Option<Expense>> {
        self.store().find_by_id(id)
    }

    pub(crate) fn update_expense(&self, id: i64, update: &ExpenseUpdate) -> Result<Option<Expense>> {
        let Some(mut expense) = self.find_by_id(id)? else {
            return Ok(None);
        };
        if let Some(amount) = update.amount {
            ensure_positive(amount)?;
        }
        if let Some(category) = update.category.as_deref() {
            if category != expense.category {
                self.ensure_usable_category(category)?;
            }
        }
        update.apply(&mut expense);

        self.conn.execute(
            "UPDATE expense SET amount = ?1, category = ?2, date = ?3 WHERE id = ?4",
            params![expense.amount.to_string(), expense.category, expense.date, id],
        )?;
        Ok(Some(expense))
    }

    pub(crate) fn delete_expense(&self, id: i64) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM expense WHERE id = ?1", params![id])?;
        Ok(deleted > 0)
    }

    pub(crate) fn expense_count(&self) -> Result<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM expense", [], |row| row.get(0))?)
    }

    /// Every distinct category name referenced by an expense.
    pub(crate) fn referenced_categories(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT category FROM expense ORDER BY category")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Point the AUTOINCREMENT counter at the largest expense id so the next
    /// auto-assigned id is `max + 1`. Errors are logged, never returned.
    pub(crate) fn reset_id_sequence(&self) {
        if self.in_memory {
            log::info!("In-memory store: skipping id sequence reset");
            return;
        }
        match self.try_reset_id_sequence() {
            Ok(Some(next)) => log::info!("Reset expense id sequence, next id is {next}"),
            Ok(None) => log::info!("No expense id sequence yet, nothing to reset"),
            Err(e) => log::error!("Failed to reset expense id sequence: {e:?}"),
        }
    }

    fn try_reset_id_sequence(&self) -> Result<Option<i64>> {
        let has_sequences: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='sqlite_sequence')",
            [],
            |row| row.get(0),
        )?;
        if !has_sequences {
            return Ok(None);
        }

        let max_id: i64 =
            self.conn
                .query_row("SELECT COALESCE(MAX(id), 0) FROM expense", [], |row| row.get(0))?;
        let updated = self.conn.execute(
            "UPDATE sqlite_sequence SET seq = ?1 WHERE name = ?2",
            params![max_id, schema::EXPENSE_SEQUENCE],
        )?;
        Ok((updated > 0).then_some(max_id + 1))
    }

    // ── Categories ────────────────────────────────────────────

    /// Create an active category. A preset name always gets its preset
    /// color; otherwise `color` is used when given, else a fresh pastel.
    pub(crate) fn create_category(&self, name: &str, color: Option<&str>) -> Result<Category> {
        if name.trim().is_empty() {
            return Err(ValidationError::BlankCategoryName.into());
        }
        if self.find_category(name)?.is_some() {
            return Err(ValidationError::DuplicateCategory(name.to_string()).into());
        }

        let used = self.category_colors()?;
        let color = match (palette::preset_color(name), color) {
            (Some(preset), _) => preset.to_string(),
            (None, Some(raw)) => {
                let color = palette::normalize_color(raw)
                    .ok_or_else(|| ValidationError::InvalidColor(raw.to_string()))?;
                if used.contains(&color) || palette::is_preset_color(&color) {
                    return Err(ValidationError::ColorTaken(color).into());
                }
                color
            }
            (None, None) => palette::generate_unique_color(&used, &mut rand::thread_rng()),
        };

        let mut category = Category::new(name.to_string(), color);
        self.conn.execute(
            "INSERT INTO category (name, color, is_active) VALUES (?1, ?2, ?3)",
            params![category.name, category.color, category.is_active],
        )?;
        category.id = Some(self.conn.last_insert_rowid());
        Ok(category)
    }

    pub(crate) fn get_all_categories(&self) -> Result<Vec<Category>> {
        self.query_categories("SELECT id, name, color, is_active FROM category ORDER BY name")
    }

    pub(crate) fn get_active_categories(&self) -> Result<Vec<Category>> {
        self.query_categories(
            "SELECT id, name, color, is_active FROM category WHERE is_active = 1 ORDER BY name",
        )
    }

    fn query_categories(&self, sql: &str) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map([], category_from_row)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    pub(crate) fn find_category(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, color, is_active FROM category WHERE name = ?1",
                params![name],
                category_from_row,
            )
            .optional()?)
    }

    fn category_colors(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT color FROM category")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<std::result::Result<HashSet<_>, _>>()?)
    }

    pub(crate) fn deactivate_category(&self, name: &str) -> Result<bool> {
        self.set_category_active(name, false)
    }

    pub(crate) fn activate_category(&self, name: &str) -> Result<bool> {
        self.set_category_active(name, true)
    }

    fn set_category_active(&self, name: &str, active: bool) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE category SET is_active = ?1 WHERE name = ?2",
            params![active, name],
        )?;
        Ok(updated > 0)
    }

    /// Remove only the category row; expenses keep their category text.
    pub(crate) fn delete_category(&self, name: &str) -> Result<bool> {
        self.store().delete_category_row(name)
    }

    /// Remove every expense filed under `name`, then the category itself.
    /// Returns whether the category existed.
    pub(crate) fn delete_category_with_expenses(&mut self, name: &str) -> Result<bool> {
        self.atomic(|store| {
            let removed = store.delete_by_category(name)?;
            let found = store.delete_category_row(name)?;
            if found {
                log::info!("Deleted category '{name}' and {removed} expense(s)");
            }
            Ok(found)
        })
    }

    // ── Analytics ─────────────────────────────────────────────

    pub(crate) fn sum_by_category(&self, month: Option<&str>) -> Result<Vec<(String, Decimal)>> {
        self.store().sum_by_category(month)
    }

    /// Total spent per `YYYY-MM`, oldest first.
    pub(crate) fn monthly_totals(&self) -> Result<Vec<(String, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT strftime('%Y-%m', date) AS month, CAST(SUM(amount) AS TEXT)
             FROM expense
             GROUP BY month
             ORDER BY month ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let month: String = row.get(0)?;
            let total: String = row.get(1)?;
            Ok((month, Decimal::from_str(&total).unwrap_or_default()))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Mean of each category's monthly totals over the months it appears in.
    pub(crate) fn average_monthly_by_category(&self) -> Result<Vec<(String, Decimal)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, CAST(AVG(total) AS TEXT)
             FROM (
                 SELECT strftime('%Y-%m', date) AS month, category, SUM(amount) AS total
                 FROM expense
                 GROUP BY month, category
             )
             GROUP BY category
             ORDER BY AVG(total) DESC, category ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let name: String = row.get(0)?;
            let avg: String = row.get(1)?;
            Ok((name, Decimal::from_str(&avg).unwrap_or_default().round_dp(2)))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }

    // ── Validation ────────────────────────────────────────────

    fn ensure_usable_category(&self, name: &str) -> Result<()> {
        match self.find_category(name)? {
            None => Err(ValidationError::UnknownCategory(name.to_string()).into()),
            Some(c) if !c.is_active => Err(ValidationError::InactiveCategory(name.to_string()).into()),
            Some(_) => Ok(()),
        }
    }
}

fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(ValidationError::NonPositiveAmount(amount).into());
    }
    Ok(())
}

impl Store<'_> {
    fn delete_category_row(&self, name: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM category WHERE name = ?1", params![name])?;
        Ok(deleted > 0)
    }
}

impl ExpenseRepository for Store<'_> {
    fn find_by_id(&self, id: i64) -> Result<Option<Expense>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, amount, category, date FROM expense WHERE id = ?1",
                params![id],
                expense_from_row,
            )
            .optional()?)
    }

    fn upsert(&self, expense: &Expense) -> Result<Upserted> {
        let id = expense
            .id
            .context("Upsert needs an explicit expense id")?;
        let existed = self.find_by_id(id)?.is_some();
        self.conn.execute(
            "INSERT INTO expense (id, amount, category, date) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                 amount = excluded.amount,
                 category = excluded.category,
                 date = excluded.date",
            params![id, expense.amount.to_string(), expense.category, expense.date],
        )?;
        Ok(if existed {
            Upserted::Updated
        } else {
            Upserted::Inserted
        })
    }

    fn delete_by_category(&self, category: &str) -> Result<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM expense WHERE category = ?1", params![category])?)
    }

    fn sum_by_category(&self, month: Option<&str>) -> Result<Vec<(String, Decimal)>> {
        let pattern = month.map_or_else(|| "%".to_string(), |m| format!("{m}%"));
        let mut stmt = self.conn.prepare(
            "SELECT category, CAST(SUM(amount) AS TEXT)
             FROM expense
             WHERE date LIKE ?1
             GROUP BY category
             ORDER BY SUM(amount) DESC, category ASC",
        )?;
        let rows = stmt.query_map(params![pattern], |row| {
            let name: String = row.get(0)?;
            let total: String = row.get(1)?;
            Ok((name, Decimal::from_str(&total).unwrap_or_default()))
        })?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

fn expense_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Expense> {
    let amount_str: String = row.get(1)?;
    Ok(Expense {
        id: Some(row.get(0)?),
        amount: Decimal::from_str(&amount_str).unwrap_or_default(),
        category: row.get(2)?,
        date: row.get(3)?,
    })
}

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: Some(row.get(0)?),
        name: row.get(1)?,
        color: row.get(2)?,
        is_active: row.get(3)?,
    })
}
