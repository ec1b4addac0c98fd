use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;

use crate::backup::CsvReconciler;
use crate::db::Database;
use crate::models::{Category, ExpenseUpdate};

pub(crate) fn as_cli(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    let rest = args.get(2..).unwrap_or_default();
    match args.get(1).map(String::as_str) {
        None => cli_summary(&[], db),
        Some("import") => cli_import(rest, db, reconciler),
        Some("export") => cli_export(db, reconciler),
        Some("add") => cli_add(rest, db, reconciler),
        Some("edit") => cli_edit(rest, db, reconciler),
        Some("delete") | Some("rm") => cli_delete(rest, db, reconciler),
        Some("list") | Some("ls") => cli_list(rest, db),
        Some("categories") => cli_categories(rest, db),
        Some("category") => cli_category(rest, db, reconciler),
        Some("summary") | Some("s") => cli_summary(rest, db),
        Some("--help") | Some("-h") | Some("help") => {
            print_usage();
            Ok(())
        }
        Some("--version") | Some("-V") | Some("version") => {
            println!("expenses {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(other) => {
            print_usage();
            anyhow::bail!("Unknown command: {other}");
        }
    }
}

fn print_usage() {
    println!("expenses: personal expense tracker with CSV backup");
    println!();
    println!("Usage: expenses [command]");
    println!();
    println!("Commands:");
    println!("  (none)                        Print the summary for all months");
    println!("  import [file.csv]             Merge a CSV into the store (default: backup file)");
    println!("  export                        Rewrite the CSV backup from the store");
    println!("  add <amount> <category> [date]");
    println!("                                Record an expense (date defaults to today)");
    println!("  edit <id> [--amount A] [--category C] [--date YYYY-MM-DD]");
    println!("                                Change fields of an expense");
    println!("  delete <id>                   Delete an expense");
    println!("  list [--month YYYY-MM]        List expenses, newest first");
    println!("  categories [--active]         List categories");
    println!("  category add <name> [--color #RRGGBB]");
    println!("  category deactivate <name>    Hide a category from new expenses");
    println!("  category activate <name>      Make a category usable again");
    println!("  category delete <name> [--keep-expenses]");
    println!("                                Delete a category and its expenses");
    println!("  summary [YYYY-MM]             Totals by category and month");
    println!("  --help, -h                    Show this help");
    println!("  --version, -V                 Show version");
    println!();
    println!("Environment: CSV_FILE, TEST_MODE, EXPENSES_DB_PATH, EXPENSES_DB_NAME, RUST_LOG");
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}

fn parse_amount_arg(raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("Invalid amount: {raw}"))
}

fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date (expected YYYY-MM-DD): {raw}"))
}

fn parse_id_arg(raw: Option<&String>, usage: &str) -> Result<i64> {
    let raw = raw.ok_or_else(|| anyhow::anyhow!("Usage: {usage}"))?;
    raw.parse().with_context(|| format!("Invalid id: {raw}"))
}

fn export_after_change(db: &Database, reconciler: &CsvReconciler) {
    if reconciler.export(db).is_none() {
        eprintln!(
            "Warning: could not update CSV backup at {}",
            reconciler.csv_path().display()
        );
    }
}

// ── Backup ───────────────────────────────────────────────────

fn cli_import(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    let path = args.first().map(Path::new);
    let shown = path.unwrap_or(reconciler.csv_path());

    let count = reconciler.import(db, path);
    println!("Imported {count} expense(s) from {}", shown.display());
    if count > 0 {
        export_after_change(db, reconciler);
    }
    Ok(())
}

fn cli_export(db: &Database, reconciler: &CsvReconciler) -> Result<()> {
    let count = reconciler.try_export(db)?;
    println!(
        "Exported {count} expense(s) to {}",
        reconciler.csv_path().display()
    );
    Ok(())
}

// ── Expenses ─────────────────────────────────────────────────

fn cli_add(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    let [amount, category, rest @ ..] = args else {
        anyhow::bail!("Usage: expenses add <amount> <category> [YYYY-MM-DD]");
    };
    let amount = parse_amount_arg(amount)?;
    let date = rest.first().map(|d| parse_date_arg(d)).transpose()?;

    let expense = db.create_expense(amount, category, date)?;
    println!(
        "Added #{}: {:.2} {} on {}",
        expense.id.unwrap_or_default(),
        expense.amount,
        expense.category,
        expense.date
    );
    export_after_change(db, reconciler);
    Ok(())
}

fn cli_edit(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    const USAGE: &str = "expenses edit <id> [--amount A] [--category C] [--date YYYY-MM-DD]";
    let id = parse_id_arg(args.first(), USAGE)?;

    let update = ExpenseUpdate {
        amount: flag(args, "--amount").map(parse_amount_arg).transpose()?,
        category: flag(args, "--category").map(str::to_string),
        date: flag(args, "--date").map(parse_date_arg).transpose()?,
    };
    if update.is_empty() {
        anyhow::bail!("Nothing to change. Usage: {USAGE}");
    }

    let expense = db
        .update_expense(id, &update)?
        .ok_or_else(|| anyhow::anyhow!("Expense #{id} not found"))?;
    println!(
        "Updated #{id}: {:.2} {} on {}",
        expense.amount, expense.category, expense.date
    );
    export_after_change(db, reconciler);
    Ok(())
}

fn cli_delete(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    let id = parse_id_arg(args.first(), "expenses delete <id>")?;
    if !db.delete_expense(id)? {
        anyhow::bail!("Expense #{id} not found");
    }
    println!("Deleted #{id}");
    export_after_change(db, reconciler);
    Ok(())
}

fn cli_list(args: &[String], db: &Database) -> Result<()> {
    let month = flag(args, "--month");
    let expenses: Vec<_> = db
        .get_expenses()?
        .into_iter()
        .filter(|e| month.map_or(true, |m| e.month() == m))
        .collect();

    if expenses.is_empty() {
        println!("No expenses");
        return Ok(());
    }

    println!("{:<6} {:<12} {:<24} {:>12}", "ID", "Date", "Category", "Amount");
    println!("{}", "─".repeat(57));
    for e in &expenses {
        println!(
            "{:<6} {:<12} {:<24} {:>12.2}",
            e.id.unwrap_or(0),
            e.date.format("%Y-%m-%d").to_string(),
            e.category,
            e.amount,
        );
    }
    let total: Decimal = expenses.iter().map(|e| e.amount).sum();
    println!("{}", "─".repeat(57));
    println!("{:<44} {:>12.2}", format!("{} expense(s)", expenses.len()), total);
    Ok(())
}

// ── Categories ───────────────────────────────────────────────

fn cli_categories(args: &[String], db: &Database) -> Result<()> {
    let categories = if args.iter().any(|a| a == "--active") {
        db.get_active_categories()?
    } else {
        db.get_all_categories()?
    };
    if categories.is_empty() {
        println!("No categories");
        return Ok(());
    }

    println!("{:<28} {:<9} Status", "Name", "Color");
    println!("{}", "─".repeat(48));
    for c in &categories {
        let status = if c.is_active { "active" } else { "inactive" };
        println!("{:<28} {:<9} {status}", c.name, c.color);
    }
    Ok(())
}

fn cli_category(args: &[String], db: &mut Database, reconciler: &CsvReconciler) -> Result<()> {
    let (Some(action), Some(name)) = (args.first(), args.get(1)) else {
        anyhow::bail!("Usage: expenses category <add|deactivate|activate|delete> <name>");
    };
    let rest = &args[2..];

    match action.as_str() {
        "add" => {
            let category = db.create_category(name, flag(rest, "--color"))?;
            println!("Added category {} ({})", category.name, category.color);
        }
        "deactivate" => {
            if !db.deactivate_category(name)? {
                anyhow::bail!("Category '{name}' not found");
            }
            println!("Deactivated category {name}");
        }
        "activate" => {
            if !db.activate_category(name)? {
                anyhow::bail!("Category '{name}' not found");
            }
            println!("Activated category {name}");
        }
        "delete" => {
            let found = if rest.iter().any(|a| a == "--keep-expenses") {
                db.delete_category(name)?
            } else {
                db.delete_category_with_expenses(name)?
            };
            if !found {
                anyhow::bail!("Category '{name}' not found");
            }
            println!("Deleted category {name}");
        }
        other => anyhow::bail!("Unknown category action: {other}"),
    }

    export_after_change(db, reconciler);
    Ok(())
}

// ── Summary ──────────────────────────────────────────────────

fn cli_summary(args: &[String], db: &Database) -> Result<()> {
    let month = args.first().filter(|a| !a.starts_with('-')).map(String::as_str);

    let by_category = db.sum_by_category(month)?;
    let categories = db.get_all_categories()?;
    let count = db.expense_count()?;
    let total: Decimal = by_category.iter().map(|(_, amount)| *amount).sum();

    let title = month.unwrap_or("all months");
    let storage = if db.is_in_memory() { " (in-memory)" } else { "" };
    println!("Expenses: {title}{storage}");
    println!("{}", "─".repeat(48));
    println!("  Total:         {total:.2}");
    println!("  Stored rows:   {count}");

    if !by_category.is_empty() {
        println!();
        println!("By category:");
        for (name, amount) in &by_category {
            let color = Category::find_by_name(&categories, name)
                .map(|c| c.color.as_str())
                .unwrap_or("-");
            println!("  {name:<26} {color:<9} {amount:>10.2}");
        }
    }

    if month.is_none() {
        let monthly = db.monthly_totals()?;
        if !monthly.is_empty() {
            println!();
            println!("By month:");
            for (m, amount) in &monthly {
                println!("  {m:<26} {amount:>20.2}");
            }
        }

        let averages = db.average_monthly_by_category()?;
        if !averages.is_empty() {
            println!();
            println!("Monthly average by category:");
            for (name, amount) in &averages {
                println!("  {name:<26} {amount:>20.2}");
            }
        }
    }

    Ok(())
}
