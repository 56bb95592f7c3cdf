//! Commands that list stored records.
//!
//! - `records`: every record of a kind, served from the cache
//! - `window`: the most recent records up to a month, read from the database

use crate::args::{RecordsArgs, WindowArgs};
use crate::commands::{skipped_line, Out, Records};
use crate::dashboard::Dashboard;
use crate::model::{Month, RecordKind};
use crate::{Config, Result};

/// Lists every record of the requested kind, most recent first.
pub async fn records(config: Config, args: RecordsArgs) -> Result<Out<Records>> {
    let dashboard = Dashboard::open(&config).await;
    let (records, skipped) = match args.kind() {
        RecordKind::Expense => (
            Records::Expenses(dashboard.expenses().all_records().await),
            dashboard.expenses().cache().skipped_rows(),
        ),
        RecordKind::Income => (
            Records::Incomes(dashboard.incomes().all_records().await),
            dashboard.incomes().cache().skipped_rows(),
        ),
    };
    let heading = format!("Found {} {} record(s)", records.len(), args.kind());
    let mut text = message(heading, &records);
    if let Some(line) = skipped_line(skipped) {
        text = format!("{text}\n{line}");
    }
    Ok(Out::new(text, records))
}

/// Lists at most `months` records of the requested kind whose month is the anchor or earlier,
/// most recent first.
///
/// # Errors
/// - `StorageUnavailable` if the database cannot be read.
pub async fn window(config: Config, args: WindowArgs) -> Result<Out<Records>> {
    let anchor = args.anchor().unwrap_or_else(Month::current);
    let count = args.months().unwrap_or_else(|| config.window_months());
    let dashboard = Dashboard::open(&config).await;
    let records = match args.kind() {
        RecordKind::Expense => Records::Expenses(
            dashboard
                .expenses()
                .windowed_query(anchor, count)
                .await
                .into_result()?,
        ),
        RecordKind::Income => Records::Incomes(
            dashboard
                .incomes()
                .windowed_query(anchor, count)
                .await
                .into_result()?,
        ),
    };
    let heading = format!(
        "Found {} {} record(s) up to {anchor} (limit {count})",
        records.len(),
        args.kind()
    );
    Ok(Out::new(message(heading, &records), records))
}

fn message(heading: String, records: &Records) -> String {
    let mut lines = vec![heading];
    lines.extend(records.lines());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Income, IncomeSources, Record};
    use crate::test::TestEnv;
    use std::str::FromStr;

    async fn seed(env: &TestEnv, months: &[&str]) {
        let dashboard = Dashboard::open(&env.config()).await;
        for (i, m) in months.iter().enumerate() {
            let income = Income::new(
                Month::from_str(m).unwrap().first_day(),
                IncomeSources {
                    salary: Amount::from(u32::try_from(i).unwrap() + 1),
                    ..IncomeSources::default()
                },
            )
            .unwrap();
            dashboard.incomes().insert(income).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_records_lists_everything_newest_first() {
        let env = TestEnv::new().await;
        seed(&env, &["2024-01", "2024-03", "2024-02"]).await;

        let out = records(env.config(), RecordsArgs::new(RecordKind::Income))
            .await
            .unwrap();

        let Some(Records::Incomes(incomes)) = out.structure() else {
            panic!("expected incomes, got {:?}", out.structure());
        };
        let months: Vec<String> = incomes.iter().map(|r| r.month().to_string()).collect();
        assert_eq!(months, vec!["2024-03", "2024-02", "2024-01"]);
        assert!(out.message().starts_with("Found 3 income record(s)"));
    }

    #[tokio::test]
    async fn test_records_reports_unreadable_rows() {
        let env = TestEnv::new().await;
        seed(&env, &["2024-01"]).await;
        sqlx::query("INSERT INTO income (date, salary) VALUES ('someday', 5)")
            .execute(env.config().db().pool())
            .await
            .unwrap();

        let out = records(env.config(), RecordsArgs::new(RecordKind::Income))
            .await
            .unwrap();

        assert_eq!(out.structure().map(|r| r.len()), Some(1));
        assert!(out.message().ends_with("1 stored row(s) could not be read and are not included"));
    }

    #[tokio::test]
    async fn test_window_respects_anchor_and_limit() {
        let env = TestEnv::new().await;
        seed(&env, &["2024-01", "2024-02", "2024-03", "2024-04", "2024-05"]).await;
        let args = WindowArgs::new(
            RecordKind::Income,
            Some(Month::from_str("2024-04").unwrap()),
            Some(2),
        );

        let out = window(env.config(), args).await.unwrap();

        let Some(Records::Incomes(incomes)) = out.structure() else {
            panic!("expected incomes, got {:?}", out.structure());
        };
        let months: Vec<String> = incomes.iter().map(|r| r.month().to_string()).collect();
        assert_eq!(months, vec!["2024-04", "2024-03"]);
    }

    #[tokio::test]
    async fn test_window_of_empty_kind() {
        let env = TestEnv::new().await;
        let args = WindowArgs::new(RecordKind::Expense, None, None);
        let out = window(env.config(), args).await.unwrap();
        assert!(out.structure().unwrap().is_empty());
    }
}
