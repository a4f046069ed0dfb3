use crate::model;

/// Display window selectable for a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeWindow {
    All,
    ThreeYears,
    OneYear,
    SixMonths,
    ThreeMonths,
    OneMonth,
    OneWeek,
}

/// How far back a window reaches from "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookback {
    Months(u32),
    Days(u64),
}

impl TimeWindow {
    /// Every window, in the order the selector shows them.
    pub const ALL_WINDOWS: [TimeWindow; 7] = [
        TimeWindow::All,
        TimeWindow::ThreeYears,
        TimeWindow::OneYear,
        TimeWindow::SixMonths,
        TimeWindow::ThreeMonths,
        TimeWindow::OneMonth,
        TimeWindow::OneWeek,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::All => "ALL",
            TimeWindow::ThreeYears => "3Y",
            TimeWindow::OneYear => "1Y",
            TimeWindow::SixMonths => "6M",
            TimeWindow::ThreeMonths => "3M",
            TimeWindow::OneMonth => "1M",
            TimeWindow::OneWeek => "1W",
        }
    }

    fn lookback(&self) -> Option<Lookback> {
        match self {
            TimeWindow::All => None,
            TimeWindow::ThreeYears => Some(Lookback::Months(36)),
            TimeWindow::OneYear => Some(Lookback::Months(12)),
            TimeWindow::SixMonths => Some(Lookback::Months(6)),
            TimeWindow::ThreeMonths => Some(Lookback::Months(3)),
            TimeWindow::OneMonth => Some(Lookback::Months(1)),
            TimeWindow::OneWeek => Some(Lookback::Days(7)),
        }
    }

    /// Earliest date kept by this window, or `None` for `ALL`.
    ///
    /// Month offsets clamp to the last day of the target month, so
    /// `2025-03-31` minus one month is `2025-02-28`.
    pub fn cutoff(&self, today: chrono::NaiveDate) -> Option<chrono::NaiveDate> {
        match self.lookback()? {
            Lookback::Months(m) => today.checked_sub_months(chrono::Months::new(m)),
            Lookback::Days(d) => today.checked_sub_days(chrono::Days::new(d)),
        }
    }

    /// Point cap for the dense windows. Daily data over one calendar month
    /// can hold 31 points; the chart shows a fixed 30.
    pub fn max_points(&self) -> Option<usize> {
        match self {
            TimeWindow::OneWeek => Some(7),
            TimeWindow::OneMonth => Some(30),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        TimeWindow::ALL_WINDOWS
            .into_iter()
            .find(|w| w.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown window '{}'. Available: ALL, 3Y, 1Y, 6M, 3M, 1M, 1W",
                    s
                )
            })
    }
}

/// Bound on the number of points handed to the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DensityLimit {
    /// Hard upper bound on output length.
    pub max_points: usize,
    /// Most recent points always kept one-for-one.
    pub tail_points: usize,
}

impl Default for DensityLimit {
    fn default() -> Self {
        Self {
            max_points: 500,
            tail_points: 60,
        }
    }
}

/// Filters a series down to a display window.
///
/// `ALL` and empty input are returned unchanged. Otherwise every point dated
/// on or after the window's cutoff is kept, in input order, and the dense
/// windows (`1M`, `1W`) keep only their most recent `max_points` of those.
///
/// The point cap applies only within the cutoff: a series that ended before
/// the cutoff yields nothing, even for `1W` and `1M`.
///
/// # Arguments
/// * `points` - Series to filter. Sorted input is expected but not required.
/// * `window` - Requested window.
/// * `today` - Reference date the cutoff is measured from.
///
/// # Returns
/// * `Vec<TimeSeriesPoint>` - Retained points, order preserved.
pub fn reduce(
    points: &[model::TimeSeriesPoint],
    window: TimeWindow,
    today: chrono::NaiveDate,
) -> Vec<model::TimeSeriesPoint> {
    let cutoff = match window.cutoff(today) {
        Some(cutoff) if !points.is_empty() => cutoff,
        _ => return points.to_vec(),
    };

    let kept: Vec<&model::TimeSeriesPoint> = points.iter().filter(|p| p.date >= cutoff).collect();
    let skip = window
        .max_points()
        .map_or(0, |cap| kept.len().saturating_sub(cap));

    kept.into_iter().skip(skip).cloned().collect()
}

/// Subsamples a long series for display.
///
/// Series at or below `limit.max_points` are returned unchanged. Longer
/// series keep their last `tail_points` points contiguously; the older head
/// is sampled with a fixed stride starting at its first point, chosen so the
/// total never exceeds `max_points`.
///
/// # Arguments
/// * `points` - Series to thin.
/// * `limit` - Density bound.
///
/// # Returns
/// * `Vec<TimeSeriesPoint>` - At most `max_points` points, order preserved.
pub fn downsample(points: &[model::TimeSeriesPoint], limit: DensityLimit) -> Vec<model::TimeSeriesPoint> {
    let max_points = limit.max_points.max(1);
    if points.len() <= max_points {
        return points.to_vec();
    }

    let tail_len = limit.tail_points.min(max_points - 1);
    let (head, tail) = points.split_at(points.len() - tail_len);
    let head_budget = max_points - tail_len;
    let stride = head.len().div_ceil(head_budget);

    let mut out = Vec::with_capacity(max_points);
    out.extend(head.iter().step_by(stride).cloned());
    out.extend_from_slice(tail);
    out
}

/// Window filter followed by density reduction; what the chart receives.
pub fn reduce_for_display(
    points: &[model::TimeSeriesPoint],
    window: TimeWindow,
    today: chrono::NaiveDate,
    limit: DensityLimit,
) -> Vec<model::TimeSeriesPoint> {
    downsample(&reduce(points, window, today), limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// `n` consecutive daily points ending on `last`, priced 0..n.
    fn daily(n: usize, last: chrono::NaiveDate) -> Vec<model::TimeSeriesPoint> {
        (0..n)
            .map(|i| {
                let date = last - chrono::Days::new((n - 1 - i) as u64);
                model::TimeSeriesPoint::new(
                    date,
                    model::Metrics {
                        price: Some(i as f64),
                        ..Default::default()
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("1y".parse::<TimeWindow>().unwrap(), TimeWindow::OneYear);
        assert_eq!("ALL".parse::<TimeWindow>().unwrap(), TimeWindow::All);
        assert_eq!(" 1W ".parse::<TimeWindow>().unwrap(), TimeWindow::OneWeek);
        assert!("2Y".parse::<TimeWindow>().is_err());
        for w in TimeWindow::ALL_WINDOWS {
            assert_eq!(w.to_string().parse::<TimeWindow>().unwrap(), w);
        }
    }

    #[test]
    fn test_cutoffs() {
        let today = ymd(2025, 9, 2);
        assert_eq!(TimeWindow::All.cutoff(today), None);
        assert_eq!(TimeWindow::ThreeYears.cutoff(today), Some(ymd(2022, 9, 2)));
        assert_eq!(TimeWindow::OneYear.cutoff(today), Some(ymd(2024, 9, 2)));
        assert_eq!(TimeWindow::SixMonths.cutoff(today), Some(ymd(2025, 3, 2)));
        assert_eq!(TimeWindow::ThreeMonths.cutoff(today), Some(ymd(2025, 6, 2)));
        assert_eq!(TimeWindow::OneMonth.cutoff(today), Some(ymd(2025, 8, 2)));
        assert_eq!(TimeWindow::OneWeek.cutoff(today), Some(ymd(2025, 8, 26)));
        assert_eq!(TimeWindow::OneMonth.cutoff(ymd(2025, 3, 31)), Some(ymd(2025, 2, 28)));
    }

    #[test]
    fn test_all_is_identity() {
        let today = ymd(2025, 9, 2);
        let points = daily(1000, ymd(2025, 9, 1));
        assert_eq!(reduce(&points, TimeWindow::All, today), points);
        assert!(reduce(&[], TimeWindow::All, today).is_empty());
        assert!(reduce(&[], TimeWindow::OneWeek, today).is_empty());
    }

    #[test]
    fn test_one_year_keeps_last_365_days() {
        let today = ymd(2025, 9, 2);
        let points = daily(400, ymd(2025, 9, 1));
        let out = reduce(&points, TimeWindow::OneYear, today);
        assert_eq!(out.len(), 365);
        assert_eq!(out[0].date, ymd(2024, 9, 2));
        assert_eq!(out.as_slice(), &points[35..]);
    }

    #[test]
    fn test_one_week_keeps_last_seven() {
        let today = ymd(2025, 9, 2);
        // Data through today gives 8 dates on or after the cutoff.
        let points = daily(20, today);
        let out = reduce(&points, TimeWindow::OneWeek, today);
        assert_eq!(out.as_slice(), &points[13..]);

        let points = daily(20, ymd(2025, 9, 1));
        let out = reduce(&points, TimeWindow::OneWeek, today);
        assert_eq!(out.as_slice(), &points[13..]);
    }

    #[test]
    fn test_one_month_keeps_last_thirty() {
        let today = ymd(2025, 9, 2);
        let points = daily(90, ymd(2025, 9, 1));
        let out = reduce(&points, TimeWindow::OneMonth, today);
        assert_eq!(out.len(), 30);
        assert_eq!(out.as_slice(), &points[60..]);
    }

    #[test]
    fn test_retained_points_lie_inside_window() {
        let today = ymd(2025, 9, 2);
        let points = daily(1500, ymd(2025, 8, 15));
        let latest = points.last().unwrap().date;
        for window in TimeWindow::ALL_WINDOWS.into_iter().skip(1) {
            let cutoff = window.cutoff(today).unwrap();
            let out = reduce(&points, window, today);
            assert!(out.iter().all(|p| p.date >= cutoff && p.date <= latest), "{}", window);
            assert_eq!(reduce(&out, window, today), out, "idempotent {}", window);
        }
    }

    #[test]
    fn test_stale_series_can_reduce_to_nothing() {
        let points = daily(30, ymd(2020, 1, 31));
        assert!(reduce(&points, TimeWindow::OneYear, ymd(2025, 9, 2)).is_empty());
        assert!(reduce(&points, TimeWindow::OneWeek, ymd(2025, 9, 2)).is_empty());
        assert!(reduce(&points, TimeWindow::OneMonth, ymd(2025, 9, 2)).is_empty());
    }

    #[test]
    fn test_unsorted_input_keeps_relative_order() {
        let today = ymd(2025, 9, 2);
        let mut points = daily(10, ymd(2025, 9, 1));
        points.swap(7, 9);
        let out = reduce(&points, TimeWindow::ThreeMonths, today);
        assert_eq!(out, points);
    }

    #[test]
    fn test_downsample_short_series_untouched() {
        let points = daily(100, ymd(2025, 9, 1));
        let limit = DensityLimit { max_points: 100, tail_points: 10 };
        assert_eq!(downsample(&points, limit), points);
    }

    #[test]
    fn test_downsample_bounds_output_and_keeps_tail() {
        let points = daily(1000, ymd(2025, 9, 1));
        let limit = DensityLimit { max_points: 100, tail_points: 20 };
        let out = downsample(&points, limit);

        assert!(out.len() <= 100);
        assert_eq!(&out[out.len() - 20..], &points[980..]);
        assert_eq!(out[0], points[0]);
        assert!(out.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(downsample(&out, limit), out);
    }

    #[test]
    fn test_downsample_tail_larger_than_limit() {
        let points = daily(50, ymd(2025, 9, 1));
        let limit = DensityLimit { max_points: 10, tail_points: 40 };
        let out = downsample(&points, limit);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0], points[0]);
        assert_eq!(&out[1..], &points[41..]);
    }

    #[test]
    fn test_reduce_for_display_combines_both() {
        let today = ymd(2025, 9, 2);
        let points = daily(2000, ymd(2025, 9, 1));
        let limit = DensityLimit { max_points: 200, tail_points: 30 };
        let out = reduce_for_display(&points, TimeWindow::All, today, limit);
        assert!(out.len() <= 200);
        assert_eq!(out.last(), points.last());

        let week = reduce_for_display(&points, TimeWindow::OneWeek, today, limit);
        assert_eq!(week.as_slice(), &points[1993..]);
    }
}
