//! CSV backup of the expense table: export after every change, import (upsert
//! by id) at startup.

mod decode;

use anyhow::{Context, Result};
use csv::StringRecord;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::db::{Database, ExpenseRepository};
use crate::error::ReconcileError;
use crate::models::Expense;
use decode::{cell, map_columns, normalize_header, parse_amount, parse_date, parse_id, ColumnMap};

const EXPORT_HEADERS: [&str; 4] = ["ID", "Kwota", "Kategoria", "Data"];

/// Per-row tally of one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ImportSummary {
    pub(crate) imported: usize,
    pub(crate) skipped: usize,
    pub(crate) failed: usize,
}

pub(crate) struct CsvReconciler {
    csv_path: PathBuf,
}

impl CsvReconciler {
    pub(crate) fn new(csv_path: impl Into<PathBuf>) -> Self {
        Self {
            csv_path: csv_path.into(),
        }
    }

    pub(crate) fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Merge a CSV file (the configured one unless `path` is given) into the
    /// store and return how many rows were written. Never fails: problems
    /// are logged and reported as 0.
    pub(crate) fn import(&self, db: &mut Database, path: Option<&Path>) -> usize {
        let path = path.unwrap_or(&self.csv_path);
        match self.try_import(db, Some(path)) {
            Ok(summary) => summary.imported,
            Err(e) => {
                log::error!("CSV import from {} failed: {e:?}", path.display());
                0
            }
        }
    }

    pub(crate) fn try_import(&self, db: &mut Database, path: Option<&Path>) -> Result<ImportSummary> {
        let path = path.unwrap_or(&self.csv_path);
        log::info!("Importing CSV from {}", path.display());

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ReconcileError::MissingFile(path.display().to_string()).into());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };

        let table = decode::read_table(&bytes)
            .ok_or_else(|| ReconcileError::Undecodable(path.display().to_string()))?;
        log::debug!("Decoded {} as {}", path.display(), table.encoding.label());

        if table.rows.is_empty() {
            log::info!("CSV file is empty");
            return Ok(ImportSummary::default());
        }

        let headers: Vec<String> = table.headers.iter().map(|h| normalize_header(h)).collect();
        let columns =
            map_columns(&headers).ok_or_else(|| ReconcileError::UnexpectedHeaders(headers.clone()))?;
        log::info!("Found columns {headers:?}, {} row(s)", table.rows.len());

        let summary = db.atomic(|store| Ok(apply_rows(store, &columns, &table.rows)))?;
        log::info!(
            "CSV import finished: {} imported, {} skipped, {} failed",
            summary.imported,
            summary.skipped,
            summary.failed
        );

        let created = ensure_categories(db)?;
        if created > 0 {
            log::info!("Created {created} missing categories from imported expenses");
        }

        Ok(summary)
    }

    /// Write every expense to the configured CSV, oldest first. Returns the
    /// row count, or `None` after logging if the file could not be written.
    pub(crate) fn export(&self, db: &Database) -> Option<usize> {
        match self.try_export(db) {
            Ok(count) => Some(count),
            Err(e) => {
                log::error!("CSV export to {} failed: {e:?}", self.csv_path.display());
                None
            }
        }
    }

    pub(crate) fn try_export(&self, db: &Database) -> Result<usize> {
        let expenses = db.get_expenses_for_export()?;

        if let Some(parent) = self.csv_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let mut file = File::create(&self.csv_path)
            .with_context(|| format!("Failed to create {}", self.csv_path.display()))?;
        // BOM so spreadsheet tools pick UTF-8.
        file.write_all(decode::UTF8_BOM)?;

        let mut wtr = csv::Writer::from_writer(file);
        wtr.write_record(EXPORT_HEADERS)?;
        for e in &expenses {
            wtr.write_record([
                e.id.unwrap_or_default().to_string(),
                e.amount.to_string(),
                e.category.clone(),
                e.date.format("%Y-%m-%d").to_string(),
            ])?;
        }
        wtr.flush()?;

        if expenses.is_empty() {
            log::info!("Exported empty expense table to {}", self.csv_path.display());
        } else {
            log::info!("Exported {} expense(s) to {}", expenses.len(), self.csv_path.display());
        }
        Ok(expenses.len())
    }
}

enum Prepared {
    Ready(Expense),
    Skip(String),
}

/// Upsert every usable row. A bad row is logged and counted, never fatal.
///
/// Imported rows are written as-is: unlike `Database::create_expense`, the
/// amount sign and the category's existence or activity are not checked.
pub(crate) fn apply_rows<R: ExpenseRepository>(
    repo: &R,
    columns: &ColumnMap,
    rows: &[StringRecord],
) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (i, record) in rows.iter().enumerate() {
        let line = i + 2;
        let outcome = prepare_row(columns, record).and_then(|prepared| match prepared {
            Prepared::Ready(expense) => repo.upsert(&expense).map(|outcome| {
                log::debug!("Line {line}: {outcome:?} expense #{}", expense.id.unwrap_or_default());
                None
            }),
            Prepared::Skip(reason) => Ok(Some(reason)),
        });

        match outcome {
            Ok(None) => summary.imported += 1,
            Ok(Some(reason)) => {
                log::warn!("Skipping line {line} ({reason}): {:?}", fields(record));
                summary.skipped += 1;
            }
            Err(e) => {
                log::error!("Failed to import line {line} {:?}: {e:#}", fields(record));
                summary.failed += 1;
            }
        }
    }

    summary
}

fn prepare_row(columns: &ColumnMap, record: &StringRecord) -> Result<Prepared> {
    let (Some(amount), Some(date), Some(category)) = (
        cell(record, columns.amount),
        cell(record, columns.date),
        cell(record, columns.category),
    ) else {
        return Ok(Prepared::Skip("missing amount, date or category".into()));
    };

    let Ok(date) = parse_date(date) else {
        return Ok(Prepared::Skip(format!("invalid date '{date}'")));
    };

    let id = parse_id(cell(record, columns.id).unwrap_or_default())?;
    let amount = parse_amount(amount)?;

    Ok(Prepared::Ready(Expense {
        id: Some(id),
        ..Expense::new(amount, category.to_string(), date)
    }))
}

fn fields(record: &StringRecord) -> Vec<&str> {
    record.iter().collect()
}

/// Create a category for every name an expense uses but the category table
/// lacks. Returns how many were created.
fn ensure_categories(db: &Database) -> Result<usize> {
    let mut existing: HashSet<String> = db
        .get_all_categories()?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut created = 0;
    for name in db.referenced_categories()? {
        if existing.contains(&name) {
            continue;
        }
        let category = db
            .create_category(&name, None)
            .with_context(|| format!("Failed to create category '{name}'"))?;
        log::info!("Added category '{}' with color {}", category.name, category.color);
        existing.insert(name);
        created += 1;
    }
    Ok(created)
}
