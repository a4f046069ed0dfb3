use crate::model;
use crate::progress;

use rayon::prelude::*;

/// Result of checking a series for consecutive daily coverage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapReport {
    pub start: Option<chrono::NaiveDate>,
    pub end: Option<chrono::NaiveDate>,
    /// Distinct dates present.
    pub total_days: usize,
    /// Days between `start` and `end`, inclusive.
    pub expected_days: usize,
    pub missing_days: Vec<chrono::NaiveDate>,
    pub duplicates: usize,
}

impl GapReport {
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// An empty series is never complete.
    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.missing_days.is_empty() && self.duplicates == 0
    }
}

/// Checks that a series covers every calendar day between its first and
/// last date exactly once.
///
/// Input order does not matter.
///
/// # Arguments
/// * `points` - Series to check.
///
/// # Returns
/// * `GapReport` - Coverage figures and the list of missing days.
pub fn validate_consecutive_days(points: &[model::TimeSeriesPoint]) -> GapReport {
    let dates: std::collections::BTreeSet<chrono::NaiveDate> = points.iter().map(|p| p.date).collect();
    let (Some(&start), Some(&end)) = (dates.first(), dates.last()) else {
        return GapReport::default();
    };

    let mut missing_days = Vec::new();
    let mut prev = start;
    for &date in dates.iter().skip(1) {
        missing_days.extend(prev.iter_days().skip(1).take_while(|d| *d < date));
        prev = date;
    }

    GapReport {
        start: Some(start),
        end: Some(end),
        total_days: dates.len(),
        expected_days: (end - start).num_days() as usize + 1,
        missing_days,
        duplicates: points.len() - dates.len(),
    }
}

/// Gap-filled series plus the number of synthesized points.
#[derive(Debug, Clone, PartialEq)]
pub struct FillOutcome {
    pub points: Vec<model::TimeSeriesPoint>,
    pub filled: usize,
}

/// Forward-fills every missing day of a series.
///
/// Each missing day gets a copy of the last known point's metrics, marked
/// `interpolated`, with daily volume reset to zero. Weekly figures
/// (`il7d`, `volume_usd_7d`) are carried forward unchanged. The output is sorted and holds one point
/// per date (first occurrence wins).
pub fn fill_gaps(points: &[model::TimeSeriesPoint]) -> FillOutcome {
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| p.date);
    sorted.dedup_by_key(|p| p.date);

    let mut out = Vec::with_capacity(sorted.len());
    let mut filled = 0;
    let mut iter = sorted.into_iter().peekable();
    while let Some(point) = iter.next() {
        let next_date = iter.peek().map(|p| p.date);
        let template = point.metrics;
        let last_date = point.date;
        out.push(point);

        if let Some(next_date) = next_date {
            for date in last_date.iter_days().skip(1).take_while(|d| *d < next_date) {
                let metrics = model::Metrics {
                    volume_usd_1d: template.volume_usd_1d.map(|_| 0.0),
                    ..template
                };
                out.push(model::TimeSeriesPoint {
                    date,
                    metrics,
                    interpolated: true,
                });
                filled += 1;
            }
        }
    }

    FillOutcome { points: out, filled }
}

/// Validates every series of a dataset in parallel.
///
/// # Returns
/// * `anyhow::Result<Vec<(String, GapReport)>>` - One report per series, in id order.
pub fn validate_dataset(dataset: &model::Dataset) -> anyhow::Result<Vec<(String, GapReport)>> {
    let bar = progress::series_bar(dataset.len(), "validate")?;
    let reports = dataset
        .series
        .par_iter()
        .map(|(id, series)| {
            let report = validate_consecutive_days(&series.points);
            bar.inc(1);
            (id.clone(), report)
        })
        .collect::<Vec<_>>();
    bar.finish_and_clear();
    anyhow::Ok(reports)
}

/// Gap-fills every series of a dataset in parallel.
///
/// # Returns
/// * `anyhow::Result<(Dataset, usize)>` - Filled dataset and the total number of synthesized points.
pub fn fill_dataset(dataset: &model::Dataset) -> anyhow::Result<(model::Dataset, usize)> {
    let bar = progress::series_bar(dataset.len(), "fill")?;
    let filled = dataset
        .series
        .par_iter()
        .map(|(id, series)| {
            let outcome = fill_gaps(&series.points);
            if outcome.filled > 0 {
                tracing::info!(series = %id, filled = outcome.filled, "Filled missing days");
            }
            bar.inc(1);
            let series = model::Series {
                id: series.id.clone(),
                kind: series.kind,
                metadata: series.metadata.clone(),
                points: outcome.points,
            };
            (id.clone(), series, outcome.filled)
        })
        .collect::<Vec<_>>();
    bar.finish_and_clear();

    let mut out = model::Dataset::empty(dataset.kind);
    let mut total = 0;
    for (id, series, count) in filled {
        total += count;
        out.series.insert(id, series);
    }
    anyhow::Ok((out, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn pool_point(date: chrono::NaiveDate, tvl: f64) -> model::TimeSeriesPoint {
        model::TimeSeriesPoint::new(
            date,
            model::Metrics {
                tvl_usd: Some(tvl),
                apy: Some(4.2),
                volume_usd_1d: Some(1000.0),
                ..Default::default()
            },
        )
    }

    fn pool_dataset(points: Vec<model::TimeSeriesPoint>) -> model::Dataset {
        let mut dataset = model::Dataset::empty(model::SeriesKind::Pool);
        dataset.series.insert(
            "orca".to_string(),
            model::Series {
                id: "orca".to_string(),
                kind: model::SeriesKind::Pool,
                metadata: Default::default(),
                points,
            },
        );
        dataset
    }

    #[test]
    fn test_complete_series() {
        let points: Vec<_> = (1..=10).map(|d| pool_point(ymd(2025, 1, d), 1.0)).collect();
        let report = validate_consecutive_days(&points);
        assert!(report.is_complete());
        assert_eq!(report.total_days, 10);
        assert_eq!(report.expected_days, 10);
    }

    #[test]
    fn test_gaps_and_duplicates_reported() {
        let points = vec![
            pool_point(ymd(2024, 2, 27), 1.0),
            pool_point(ymd(2024, 3, 2), 2.0),
            pool_point(ymd(2024, 2, 27), 3.0),
            pool_point(ymd(2024, 3, 3), 4.0),
        ];
        let report = validate_consecutive_days(&points);
        assert!(!report.is_complete());
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.expected_days, 6);
        assert_eq!(report.total_days, 3);
        assert_eq!(
            report.missing_days,
            vec![ymd(2024, 2, 28), ymd(2024, 2, 29), ymd(2024, 3, 1)]
        );
    }

    #[test]
    fn test_empty_series_is_not_complete() {
        let report = validate_consecutive_days(&[]);
        assert!(report.is_empty());
        assert!(!report.is_complete());
    }

    #[test]
    fn test_fill_gaps_forward_fills() {
        let points = vec![pool_point(ymd(2025, 1, 4), 40.0), pool_point(ymd(2025, 1, 1), 10.0)];
        let outcome = fill_gaps(&points);
        assert_eq!(outcome.filled, 2);
        assert_eq!(outcome.points.len(), 4);

        let filled = &outcome.points[1];
        assert_eq!(filled.date, ymd(2025, 1, 2));
        assert!(filled.interpolated);
        assert_eq!(filled.metrics.tvl_usd, Some(10.0));
        assert_eq!(filled.metrics.apy, Some(4.2));
        assert_eq!(filled.metrics.volume_usd_1d, Some(0.0));

        assert!(!outcome.points[3].interpolated);
        assert_eq!(outcome.points[3].metrics.tvl_usd, Some(40.0));
        assert!(validate_consecutive_days(&outcome.points).is_complete());
    }

    #[test]
    fn test_fill_gaps_carries_weekly_fields() {
        let mut first = pool_point(ymd(2025, 3, 1), 10.0);
        first.metrics.il7d = Some(-1.5);
        first.metrics.volume_usd_7d = Some(7000.0);
        let outcome = fill_gaps(&[first, pool_point(ymd(2025, 3, 3), 30.0)]);

        let gap = &outcome.points[1];
        assert!(gap.interpolated);
        assert_eq!(gap.metrics.il7d, Some(-1.5));
        assert_eq!(gap.metrics.volume_usd_7d, Some(7000.0));
        assert_eq!(gap.metrics.volume_usd_1d, Some(0.0));
        assert_eq!(outcome.points[2].metrics.il7d, None);
    }

    #[test]
    fn test_fill_gaps_leaves_absent_volume_absent() {
        let price = |date, p| {
            model::TimeSeriesPoint::new(
                date,
                model::Metrics {
                    price: Some(p),
                    ..Default::default()
                },
            )
        };
        let outcome = fill_gaps(&[price(ymd(2025, 1, 1), 1.0), price(ymd(2025, 1, 3), 3.0)]);
        assert_eq!(outcome.filled, 1);
        assert_eq!(outcome.points[1].metrics.volume_usd_1d, None);
        assert_eq!(outcome.points[1].metrics.price, Some(1.0));
    }

    #[test]
    fn test_dataset_helpers() {
        let dataset = pool_dataset(vec![pool_point(ymd(2025, 1, 1), 1.0), pool_point(ymd(2025, 1, 5), 5.0)]);
        let reports = validate_dataset(&dataset).unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].1.missing_days.len(), 3);

        let (filled, total) = fill_dataset(&dataset).unwrap();
        assert_eq!(total, 3);
        let reports = validate_dataset(&filled).unwrap();
        assert!(reports[0].1.is_complete());
    }
}
