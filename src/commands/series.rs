use crate::args::{PeriodsArgs, SeriesArgs};
use crate::commands::{amounts_line, skipped_line, Out};
use crate::dashboard::Dashboard;
use crate::model::{Month, RecordKind};
use crate::series::{anchor_choices, MonthlySeries};
use crate::{Config, Result};
use tracing::warn;

/// Builds the monthly expense and income series ending at the anchor month.
///
/// If one side cannot be read from the database, it is shown as zeros and a warning is logged.
///
/// # Errors
/// - `InvalidWindow` if the number of months is not positive or too large.
pub async fn series(config: Config, args: SeriesArgs) -> Result<Out<MonthlySeries>> {
    let anchor = args.anchor().unwrap_or_else(Month::current);
    let window_months = args
        .months()
        .unwrap_or_else(|| i64::from(config.window_months()));
    let dashboard = Dashboard::open(&config).await;
    let view = dashboard.monthly_view(anchor, window_months).await?;
    for failure in view.storage_failures() {
        warn!("Showing zeros because storage was unavailable: {failure}");
    }

    let series = view.series();
    let mut lines = vec![format!(
        "{} month(s) ending at {anchor}: expenses {}, income {}",
        series.len(),
        series.expense_total(),
        series.income_total()
    )];
    lines.extend(series.buckets().iter().map(|b| {
        format!(
            "{}  expenses {:>12}  income {:>12}  net {:>12}",
            b.month(),
            b.expense_total().to_string(),
            b.income_total().to_string(),
            b.net().to_string()
        )
    }));
    if let Some(latest) = series.latest_breakdown() {
        let split = amounts_line(RecordKind::Expense, &latest.to_vec());
        lines.push(if split.is_empty() {
            "Latest expense split: nothing spent".to_string()
        } else {
            format!("Latest expense split: {split}")
        });
    }
    lines.extend(skipped_line(view.skipped_rows()));
    Ok(Out::new(lines.join("\n"), series.clone()))
}

/// Lists the months that can be picked as an anchor, most recent first.
pub async fn periods(args: PeriodsArgs) -> Result<Out<Vec<Month>>> {
    let latest = args.anchor().unwrap_or_else(Month::current);
    let months = anchor_choices(latest, args.count());
    let message = months
        .iter()
        .map(Month::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    Ok(Out::new(message, months))
}
