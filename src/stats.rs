use crate::model;

/// Headline figures for one series, computed over its primary metric.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub records: usize,
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub first: f64,
    pub last: f64,
    /// `(last - first) / first`; `None` when `first` is zero.
    pub total_return: Option<f64>,
    /// Sample standard deviation of day-over-day percentage changes.
    pub volatility: Option<f64>,
    pub avg_confidence: Option<f64>,
    pub interpolated: usize,
}

/// Summarizes a slice of points of the given kind.
///
/// Points without a primary metric are ignored for the price figures but
/// still counted in `records`. Returns `None` when no point carries the
/// primary metric.
pub fn summarize(kind: model::SeriesKind, points: &[model::TimeSeriesPoint]) -> Option<SeriesSummary> {
    let values: Vec<(chrono::NaiveDate, f64)> = points
        .iter()
        .filter_map(|p| kind.primary(&p.metrics).map(|v| (p.date, v)))
        .filter(|(_, v)| v.is_finite())
        .collect();
    let (&(start, first), &(end, last)) = (values.first()?, values.last()?);

    let min = values.iter().map(|(_, v)| *v).fold(f64::INFINITY, f64::min);
    let max = values.iter().map(|(_, v)| *v).fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().map(|(_, v)| *v).sum::<f64>() / values.len() as f64;

    let total_return = (first != 0.0).then(|| (last - first) / first);

    let returns: Vec<f64> = values
        .windows(2)
        .filter(|w| w[0].1 != 0.0)
        .map(|w| (w[1].1 - w[0].1) / w[0].1)
        .collect();

    let confidences: Vec<f64> = points.iter().filter_map(|p| p.metrics.confidence).collect();
    let avg_confidence =
        (!confidences.is_empty()).then(|| confidences.iter().sum::<f64>() / confidences.len() as f64);

    Some(SeriesSummary {
        records: points.len(),
        start,
        end,
        min,
        max,
        avg,
        first,
        last,
        total_return,
        volatility: sample_std_dev(&returns),
        avg_confidence,
        interpolated: points.iter().filter(|p| p.interpolated).count(),
    })
}

/// Sample standard deviation; `None` with fewer than two values.
fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(var.sqrt())
}

/// One date of a comparison table.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub date: chrono::NaiveDate,
    /// One value per input series, in input order. `None` until the series
    /// has a rebased value.
    pub values: Vec<Option<f64>>,
}

/// Several series rebased to a common starting value of 100.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    /// First date on which every series has a primary value.
    pub base_date: chrono::NaiveDate,
    pub rows: Vec<ComparisonRow>,
}

/// Rebases each series' primary metric to 100 on the first shared date.
///
/// Rows start at the base date and cover every later date present in any
/// series. A series with no value on a date repeats its previous rebased
/// value. A series whose base value is zero has no rebased values at all.
///
/// # Arguments
/// * `columns` - Series kind and points of every series to compare.
///
/// # Returns
/// * `Option<Comparison>` - `None` when there is no input or no date shared by all series.
pub fn rebase_to_100(columns: &[(model::SeriesKind, &[model::TimeSeriesPoint])]) -> Option<Comparison> {
    let values: Vec<std::collections::BTreeMap<chrono::NaiveDate, f64>> = columns
        .iter()
        .map(|(kind, points)| {
            points
                .iter()
                .filter_map(|p| kind.primary(&p.metrics).map(|v| (p.date, v)))
                .filter(|(_, v)| v.is_finite())
                .collect()
        })
        .collect();

    let (first, rest) = values.split_first()?;
    let base_date = *first.keys().find(|date| rest.iter().all(|m| m.contains_key(*date)))?;
    let bases: Vec<Option<f64>> = values
        .iter()
        .map(|m| m.get(&base_date).copied().filter(|base| *base != 0.0))
        .collect();

    let dates: std::collections::BTreeSet<chrono::NaiveDate> = values
        .iter()
        .flat_map(|m| m.range(base_date..).map(|(date, _)| *date))
        .collect();

    let mut current = vec![None; values.len()];
    let mut rows = Vec::with_capacity(dates.len());
    for date in dates {
        for (slot, (series, base)) in current.iter_mut().zip(values.iter().zip(&bases)) {
            if let (Some(v), Some(base)) = (series.get(&date), base) {
                *slot = Some(v / base * 100.0);
            }
        }
        rows.push(ComparisonRow {
            date,
            values: current.clone(),
        });
    }

    Some(Comparison { base_date, rows })
}
