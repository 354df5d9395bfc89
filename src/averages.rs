use std::collections::HashMap;
use std::hash::Hash;

use chrono::{Datelike, NaiveDate};
use tracing::{error, warn};

use crate::models::{DailyScore, MonthlyAverage, SemiAnnualAverage, WeeklyAverage};
use crate::store::{self, StoreError, Table, TableStore};

#[derive(Debug, Clone, PartialEq)]
pub struct AverageTables {
    pub weekly: Vec<WeeklyAverage>,
    pub monthly: Vec<MonthlyAverage>,
    pub semi_annual: Vec<SemiAnnualAverage>,
}

#[derive(Debug)]
pub enum AggregationOutcome {
    /// The daily log was empty; the stored average tables were left as they
    /// were, not cleared.
    EmptyLog,
    Completed(AggregationSummary),
}

#[derive(Debug, Default)]
pub struct AggregationSummary {
    pub weekly_rows: usize,
    pub monthly_rows: usize,
    pub semi_annual_rows: usize,
    /// Tables whose save failed. Their previous contents remain on disk; the
    /// other tables are saved regardless.
    pub failed_tables: Vec<&'static str>,
}

/// Reads the full daily log and rewrites the three derived average tables
/// wholesale. Each save is attempted independently, so one failing table does
/// not block the other two.
pub fn recalculate(store: &TableStore) -> Result<AggregationOutcome, StoreError> {
    let scores: Vec<DailyScore> = store.load(&store::DAILY_SCORES)?;
    let Some(tables) = calculate_all_averages(&scores) else {
        warn!("daily score log is empty; nothing to aggregate");
        return Ok(AggregationOutcome::EmptyLog);
    };

    let mut summary = AggregationSummary {
        weekly_rows: tables.weekly.len(),
        monthly_rows: tables.monthly.len(),
        semi_annual_rows: tables.semi_annual.len(),
        failed_tables: Vec::new(),
    };

    save_table(store, &store::WEEKLY_AVERAGES, &tables.weekly, &mut summary);
    save_table(store, &store::MONTHLY_AVERAGES, &tables.monthly, &mut summary);
    save_table(
        store,
        &store::SEMI_ANNUAL_AVERAGES,
        &tables.semi_annual,
        &mut summary,
    );

    Ok(AggregationOutcome::Completed(summary))
}

fn save_table<T: serde::Serialize>(
    store: &TableStore,
    table: &'static Table,
    rows: &[T],
    summary: &mut AggregationSummary,
) {
    if let Err(err) = store.save(table, rows) {
        error!("failed to save table `{}`: {err}", table.name);
        summary.failed_tables.push(table.name);
    }
}

/// Derives the weekly, monthly and semi-annual average tables from the daily
/// log. Returns `None` when the log is empty.
///
/// Weekly rows are keyed by ISO-8601 week-numbering year and week, so dates
/// near January 1 can land in a different week-year than calendar year.
/// Monthly and semi-annual rows use the calendar year. Rows are ordered by
/// definition and period, and `AverageID` is a dense 1..N renumbering per
/// table on every derivation.
pub fn calculate_all_averages(scores: &[DailyScore]) -> Option<AverageTables> {
    if scores.is_empty() {
        return None;
    }

    let weekly = averaged_groups(scores, |date| {
        let week = date.iso_week();
        (week.year(), week.week())
    })
    .into_iter()
    .zip(1i64..)
    .map(|((definition_id, (year, week_of_year), average_score, data_points_count), average_id)| {
        WeeklyAverage {
            average_id,
            definition_id,
            year,
            week_of_year,
            average_score,
            data_points_count,
        }
    })
    .collect();

    let monthly = averaged_groups(scores, |date| (date.year(), date.month()))
        .into_iter()
        .zip(1i64..)
        .map(|((definition_id, (year, month), average_score, data_points_count), average_id)| {
            MonthlyAverage {
                average_id,
                definition_id,
                year,
                month,
                average_score,
                data_points_count,
            }
        })
        .collect();

    let semi_annual = averaged_groups(scores, |date| (date.year(), half_of_month(date.month())))
        .into_iter()
        .zip(1i64..)
        .map(|((definition_id, (year, half), average_score, data_points_count), average_id)| {
            SemiAnnualAverage {
                average_id,
                definition_id,
                year,
                half,
                average_score,
                data_points_count,
            }
        })
        .collect();

    Some(AverageTables {
        weekly,
        monthly,
        semi_annual,
    })
}

/// 1 for January-June, 2 for July-December.
pub fn half_of_month(month: u32) -> u32 {
    (month - 1) / 6 + 1
}

/// One pass over the log accumulating (sum, count) per (definition, bucket),
/// then materialized as (definition_id, bucket, mean, count) rows sorted by
/// definition and bucket.
fn averaged_groups<K, F>(scores: &[DailyScore], bucket: F) -> Vec<(i64, K, f64, usize)>
where
    K: Copy + Eq + Hash + Ord,
    F: Fn(NaiveDate) -> K,
{
    let mut groups: HashMap<(i64, K), (i64, usize)> = HashMap::new();
    for record in scores {
        let entry = groups
            .entry((record.definition_id, bucket(record.date)))
            .or_insert((0, 0));
        entry.0 += i64::from(record.score);
        entry.1 += 1;
    }

    let mut rows: Vec<(i64, K, f64, usize)> = groups
        .into_iter()
        .map(|((definition_id, key), (total, count))| {
            (definition_id, key, total as f64 / count as f64, count)
        })
        .collect();

    rows.sort_by_key(|&(definition_id, key, _, _)| (definition_id, key));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TableStore;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn score(definition_id: i64, date: (i32, u32, u32), score: i32) -> DailyScore {
        DailyScore {
            log_id: 0,
            definition_id,
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            score,
            notes: String::new(),
        }
    }

    #[test]
    fn empty_log_produces_no_tables() {
        assert!(calculate_all_averages(&[]).is_none());
    }

    #[test]
    fn two_scores_in_one_week_share_every_bucket() {
        let scores = vec![score(1, (2024, 1, 1), 5), score(1, (2024, 1, 2), 7)];
        let tables = calculate_all_averages(&scores).unwrap();

        assert_eq!(
            tables.weekly,
            vec![WeeklyAverage {
                average_id: 1,
                definition_id: 1,
                year: 2024,
                week_of_year: 1,
                average_score: 6.0,
                data_points_count: 2,
            }]
        );
        assert_eq!(
            tables.monthly,
            vec![MonthlyAverage {
                average_id: 1,
                definition_id: 1,
                year: 2024,
                month: 1,
                average_score: 6.0,
                data_points_count: 2,
            }]
        );
        assert_eq!(
            tables.semi_annual,
            vec![SemiAnnualAverage {
                average_id: 1,
                definition_id: 1,
                year: 2024,
                half: 1,
                average_score: 6.0,
                data_points_count: 2,
            }]
        );
    }

    #[test]
    fn iso_week_year_crosses_the_calendar_boundary() {
        // 2024-12-28 is a Saturday in ISO 2024-W52; the following Monday and
        // Tuesday belong to ISO 2025-W01 while still being December dates.
        let scores = vec![
            score(1, (2024, 12, 28), 4),
            score(1, (2024, 12, 30), 6),
            score(1, (2024, 12, 31), 8),
        ];
        let tables = calculate_all_averages(&scores).unwrap();

        assert_eq!(tables.weekly.len(), 2);
        assert_eq!((tables.weekly[0].year, tables.weekly[0].week_of_year), (2024, 52));
        assert_eq!(tables.weekly[0].data_points_count, 1);
        assert_eq!((tables.weekly[1].year, tables.weekly[1].week_of_year), (2025, 1));
        assert_eq!(tables.weekly[1].data_points_count, 2);
        assert_eq!(tables.weekly[1].average_score, 7.0);

        assert_eq!(tables.monthly.len(), 1);
        assert_eq!((tables.monthly[0].year, tables.monthly[0].month), (2024, 12));
        assert_eq!(tables.monthly[0].data_points_count, 3);
    }

    #[test]
    fn halves_split_between_june_and_july() {
        assert_eq!(half_of_month(1), 1);
        assert_eq!(half_of_month(6), 1);
        assert_eq!(half_of_month(7), 2);
        assert_eq!(half_of_month(12), 2);

        let scores = vec![score(1, (2024, 6, 30), 3), score(1, (2024, 7, 1), 9)];
        let tables = calculate_all_averages(&scores).unwrap();

        assert_eq!(tables.semi_annual.len(), 2);
        assert_eq!(tables.semi_annual[0].half, 1);
        assert_eq!(tables.semi_annual[0].average_score, 3.0);
        assert_eq!(tables.semi_annual[1].half, 2);
        assert_eq!(tables.semi_annual[1].average_score, 9.0);
    }

    #[test]
    fn counts_partition_the_log_per_definition() {
        let scores = vec![
            score(1, (2024, 1, 1), 5),
            score(1, (2024, 1, 9), 7),
            score(1, (2024, 7, 4), 2),
            score(2, (2024, 1, 1), 10),
            score(2, (2025, 3, 14), 6),
        ];
        let tables = calculate_all_averages(&scores).unwrap();

        let mut per_definition: HashMap<i64, usize> = HashMap::new();
        for record in &scores {
            *per_definition.entry(record.definition_id).or_insert(0) += 1;
        }

        for (definition_id, expected) in per_definition {
            let weekly: usize = tables
                .weekly
                .iter()
                .filter(|row| row.definition_id == definition_id)
                .map(|row| row.data_points_count)
                .sum();
            let monthly: usize = tables
                .monthly
                .iter()
                .filter(|row| row.definition_id == definition_id)
                .map(|row| row.data_points_count)
                .sum();
            let semi_annual: usize = tables
                .semi_annual
                .iter()
                .filter(|row| row.definition_id == definition_id)
                .map(|row| row.data_points_count)
                .sum();

            assert_eq!(weekly, expected);
            assert_eq!(monthly, expected);
            assert_eq!(semi_annual, expected);
        }
    }

    #[test]
    fn definitions_never_share_a_group() {
        let scores = vec![score(1, (2024, 1, 1), 2), score(2, (2024, 1, 1), 8)];
        let tables = calculate_all_averages(&scores).unwrap();

        assert_eq!(tables.weekly.len(), 2);
        assert_eq!(tables.monthly.len(), 2);
        assert_eq!(tables.semi_annual.len(), 2);
        assert_eq!(tables.weekly[0].average_score, 2.0);
        assert_eq!(tables.weekly[1].average_score, 8.0);
    }

    #[test]
    fn rows_are_ordered_with_dense_ids() {
        let scores = vec![
            score(2, (2025, 3, 14), 6),
            score(1, (2024, 7, 4), 2),
            score(1, (2024, 1, 1), 5),
        ];
        let tables = calculate_all_averages(&scores).unwrap();

        let keys: Vec<(i64, i32, u32)> = tables
            .monthly
            .iter()
            .map(|row| (row.definition_id, row.year, row.month))
            .collect();
        assert_eq!(keys, vec![(1, 2024, 1), (1, 2024, 7), (2, 2025, 3)]);

        let ids: Vec<i64> = tables.monthly.iter().map(|row| row.average_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn recalculation_is_idempotent() {
        let scores = vec![
            score(1, (2024, 1, 1), 5),
            score(1, (2024, 1, 2), 7),
            score(2, (2024, 12, 31), 9),
        ];

        let first = calculate_all_averages(&scores).unwrap();
        let second = calculate_all_averages(&scores).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_log_leaves_stored_tables_untouched() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        let stale = vec![WeeklyAverage {
            average_id: 1,
            definition_id: 7,
            year: 2023,
            week_of_year: 11,
            average_score: 4.5,
            data_points_count: 2,
        }];
        store.save(&store::WEEKLY_AVERAGES, &stale).unwrap();

        let outcome = recalculate(&store).unwrap();
        assert!(matches!(outcome, AggregationOutcome::EmptyLog));

        let kept: Vec<WeeklyAverage> = store.load(&store::WEEKLY_AVERAGES).unwrap();
        assert_eq!(kept, stale);
    }

    #[test]
    fn recalculate_overwrites_all_three_tables() {
        let dir = tempdir().unwrap();
        let store = TableStore::open(dir.path()).unwrap();

        let stale = vec![WeeklyAverage {
            average_id: 9,
            definition_id: 9,
            year: 1999,
            week_of_year: 9,
            average_score: 9.0,
            data_points_count: 9,
        }];
        store.save(&store::WEEKLY_AVERAGES, &stale).unwrap();
        store
            .save(
                &store::DAILY_SCORES,
                &[score(1, (2024, 1, 1), 5), score(1, (2024, 1, 2), 7)],
            )
            .unwrap();

        let outcome = recalculate(&store).unwrap();
        let summary = match outcome {
            AggregationOutcome::Completed(summary) => summary,
            AggregationOutcome::EmptyLog => panic!("log was not empty"),
        };
        assert_eq!(summary.weekly_rows, 1);
        assert_eq!(summary.monthly_rows, 1);
        assert_eq!(summary.semi_annual_rows, 1);
        assert!(summary.failed_tables.is_empty());

        let weekly: Vec<WeeklyAverage> = store.load(&store::WEEKLY_AVERAGES).unwrap();
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].definition_id, 1);
        assert_eq!(weekly[0].average_score, 6.0);

        let monthly: Vec<MonthlyAverage> = store.load(&store::MONTHLY_AVERAGES).unwrap();
        assert_eq!(monthly.len(), 1);
        let semi_annual: Vec<SemiAnnualAverage> =
            store.load(&store::SEMI_ANNUAL_AVERAGES).unwrap();
        assert_eq!(semi_annual.len(), 1);
    }
}
