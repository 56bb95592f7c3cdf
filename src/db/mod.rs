//! This module is responsible for reading, writing and managing the SQLite database.
//!
//! Each record kind has its own table: a `date` column holding an ISO `yyyy-MM-dd` string and one
//! `REAL` column per amount. `Db` implements `RecordStore` for both kinds.

mod migrations;

use crate::error::Res;
use crate::model::{Amount, Month, Record};
use crate::store::{Fetched, RecordStore};
use anyhow::{bail, Context};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// The format of the `date` column.
const DATE_FORMAT: &str = "%Y-%m-%d";

const MAX_CONNECTIONS: u32 = 4;

/// A handle to the SQLite database. Cloning it shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Validates that no file currently exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Initializes the database schema
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        migrations::bootstrap(&pool).await?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Validates that there is a SQLite file at `path`
    /// - Opens a connection pool
    /// - Updates the database schema with migrations if it is out-of-date
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::schema_version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema version {version} is newer than this program supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn select<R: Record>(&self, sql: &str, binds: SelectBinds) -> Res<Fetched<R>> {
        trace!("{sql}");
        let mut query = sqlx::query(sql);
        if let SelectBinds::Window { before, limit } = binds {
            query = query.bind(before).bind(limit);
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Unable to query the {} table", R::KIND.table()))?;
        Ok(decode_rows(&rows))
    }
}

enum SelectBinds {
    None,
    Window { before: String, limit: i64 },
}

async fn connect(path: &Path, create: bool) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))
        .context("Failed to parse SQLite connection string")?
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open the database at '{}'", path.display()))
}

/// `date, <amount columns...>` for `R`.
fn select_list<R: Record>() -> String {
    format!("date, {}", R::KIND.amount_columns().join(", "))
}

/// Decodes every row it can. Rows that cannot become a record are logged and counted.
fn decode_rows<R: Record>(rows: &[SqliteRow]) -> Fetched<R> {
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;
    for row in rows {
        match decode_row::<R>(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping malformed {} row: {e:#}", R::KIND);
                skipped += 1;
            }
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} malformed {} row(s)", R::KIND);
    }
    Fetched::new(records, skipped)
}

fn decode_row<R: Record>(row: &SqliteRow) -> Res<R> {
    let date: String = row
        .try_get("date")
        .context("Unable to read the date column")?;
    let date = NaiveDate::parse_from_str(&date, DATE_FORMAT)
        .with_context(|| format!("Invalid date '{date}'"))?;
    let mut amounts = Vec::with_capacity(R::KIND.amount_columns().len());
    for &column in R::KIND.amount_columns() {
        let value: f64 = row
            .try_get(column)
            .with_context(|| format!("Unable to read the '{column}' column"))?;
        let amount = Amount::from_f64(value).with_context(|| {
            format!("The '{column}' column holds {value}, which is not an amount")
        })?;
        amounts.push(amount);
    }
    Ok(R::from_amounts(date, &amounts)?)
}

#[async_trait::async_trait]
impl<R: Record> RecordStore<R> for Db {
    async fn fetch_all(&self) -> Res<Fetched<R>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY date DESC, id ASC",
            select_list::<R>(),
            R::KIND.table()
        );
        self.select(&sql, SelectBinds::None).await
    }

    async fn fetch_window(&self, anchor: Month, count: u32) -> Res<Fetched<R>> {
        // Rows may carry any day of the month, so compare against the start of the next month.
        let before = match anchor.succ() {
            Some(next) => next.first_day().format(DATE_FORMAT).to_string(),
            None => bail!("The month {anchor} is too late to be used as a window anchor"),
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE date < ? ORDER BY date DESC, id ASC LIMIT ?",
            select_list::<R>(),
            R::KIND.table()
        );
        let binds = SelectBinds::Window {
            before,
            limit: i64::from(count),
        };
        self.select(&sql, binds).await
    }

    async fn insert(&self, record: &R) -> Res<()> {
        let columns = R::KIND.amount_columns();
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO {} (date, {}) VALUES ({placeholders})",
            R::KIND.table(),
            columns.join(", ")
        );
        trace!("{sql}");
        let mut query = sqlx::query(&sql).bind(record.date().format(DATE_FORMAT).to_string());
        for amount in record.amounts() {
            query = query.bind(amount.to_f64());
        }
        query
            .execute(&self.pool)
            .await
            .with_context(|| format!("Unable to insert into the {} table", R::KIND.table()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Expense, ExpenseBreakdown, Income, IncomeSources};
    use crate::{RecordCache, DEFAULT_STORAGE_TIMEOUT};
    use tempfile::TempDir;

    async fn new_db() -> (TempDir, Db) {
        let dir = TempDir::new().unwrap();
        let db = Db::init(dir.path().join("finman.sqlite")).await.unwrap();
        (dir, db)
    }

    fn month(s: &str) -> Month {
        Month::from_str(s).unwrap()
    }

    fn expense(m: &str, food: &str) -> Expense {
        Expense::new(
            month(m).first_day(),
            ExpenseBreakdown {
                housing: Amount::from(700u32),
                food: Amount::from_str(food).unwrap(),
                ..ExpenseBreakdown::default()
            },
        )
        .unwrap()
    }

    async fn raw_expense_row(db: &Db, date: &str, housing: &str) {
        sqlx::query(&format!(
            "INSERT INTO expense (date, housing) VALUES ('{date}', {housing})"
        ))
        .execute(db.pool())
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_init_refuses_existing_file() {
        let (dir, _db) = new_db().await;
        assert!(Db::init(dir.path().join("finman.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_load_requires_file() {
        let dir = TempDir::new().unwrap();
        assert!(Db::load(dir.path().join("nope.sqlite")).await.is_err());
    }

    #[tokio::test]
    async fn test_insert_then_fetch_all_after_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("finman.sqlite");
        let db = Db::init(&path).await.unwrap();
        let first = expense("2024-03", "210.75");
        let second = expense("2024-05", "199.25");
        db.insert(&first).await.unwrap();
        db.insert(&second).await.unwrap();
        drop(db);

        let db = Db::load(&path).await.unwrap();
        let fetched: Fetched<Expense> = db.fetch_all().await.unwrap();
        assert_eq!(fetched.records(), &[second, first]);
        assert_eq!(fetched.skipped(), 0);
    }

    #[tokio::test]
    async fn test_kinds_are_independent_tables() {
        let (_dir, db) = new_db().await;
        let income = Income::new(
            month("2024-02").first_day(),
            IncomeSources {
                salary: Amount::from(3000u32),
                ..IncomeSources::default()
            },
        )
        .unwrap();
        db.insert(&income).await.unwrap();

        let incomes: Fetched<Income> = db.fetch_all().await.unwrap();
        let expenses: Fetched<Expense> = db.fetch_all().await.unwrap();
        assert_eq!(incomes.records(), &[income]);
        assert!(expenses.records().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_window_bounds_and_order() {
        let (_dir, db) = new_db().await;
        for (m, food) in [
            ("2023-12", "1"),
            ("2024-04", "4"),
            ("2024-07", "7"),
            ("2024-06", "6"),
            ("2024-05", "5"),
        ] {
            db.insert(&expense(m, food)).await.unwrap();
        }

        let fetched: Fetched<Expense> = db.fetch_window(month("2024-06"), 3).await.unwrap();
        let months: Vec<String> = fetched
            .records()
            .iter()
            .map(|e| e.month().to_string())
            .collect();
        assert_eq!(months, vec!["2024-06", "2024-05", "2024-04"]);
    }

    #[tokio::test]
    async fn test_fetch_window_includes_any_day_of_anchor_month() {
        let (_dir, db) = new_db().await;
        raw_expense_row(&db, "2024-06-15", "10").await;
        raw_expense_row(&db, "2024-07-01", "20").await;

        let fetched: Fetched<Expense> = db.fetch_window(month("2024-06"), 12).await.unwrap();
        assert_eq!(fetched.records().len(), 1);
        assert_eq!(fetched.records()[0].housing(), Amount::from(10u32));
        assert_eq!(fetched.records()[0].month(), month("2024-06"));
    }

    #[tokio::test]
    async fn test_same_month_rows_keep_insertion_order() {
        let (_dir, db) = new_db().await;
        let a = expense("2024-05", "30");
        let b = expense("2024-05", "20");
        db.insert(&a).await.unwrap();
        db.insert(&b).await.unwrap();

        let fetched: Fetched<Expense> = db.fetch_window(month("2024-05"), 5).await.unwrap();
        assert_eq!(fetched.records(), &[a, b]);
    }

    #[tokio::test]
    async fn test_malformed_rows_are_skipped_and_counted() {
        let (_dir, db) = new_db().await;
        db.insert(&expense("2024-01", "12.5")).await.unwrap();
        raw_expense_row(&db, "January 2024", "10").await;
        raw_expense_row(&db, "2024-02-01", "'lots'").await;
        raw_expense_row(&db, "2024-03-01", "-5").await;

        let fetched: Fetched<Expense> = db.fetch_all().await.unwrap();
        assert_eq!(fetched.records().len(), 1);
        assert_eq!(fetched.skipped(), 3);
        assert!(!fetched.is_unavailable());
    }

    #[tokio::test]
    async fn test_cache_counts_unreadable_rows() {
        let (_dir, db) = new_db().await;
        db.insert(&expense("2024-03", "3")).await.unwrap();
        raw_expense_row(&db, "March", "1").await;

        let cache = RecordCache::<Expense>::empty();
        let skipped = cache.refresh(&db, DEFAULT_STORAGE_TIMEOUT).await.unwrap();

        assert_eq!(skipped, 1);
        assert_eq!(cache.skipped_rows(), 1);
        assert_eq!(cache.len().await, 1);
    }
}
