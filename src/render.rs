use crate::dataset;
use crate::model;
use crate::quality;
use crate::stats;
use crate::utils;
use crate::window;

/// One row of a CSV export.
#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    price: Option<f64>,
    tvl_usd: Option<f64>,
    apy: Option<f64>,
    apy_base: Option<f64>,
    apy_reward: Option<f64>,
    il7d: Option<f64>,
    volume_usd_1d: Option<f64>,
    volume_usd_7d: Option<f64>,
    confidence: Option<f64>,
    interpolated: bool,
}

impl From<&model::TimeSeriesPoint> for CsvRow {
    fn from(point: &model::TimeSeriesPoint) -> Self {
        let m = &point.metrics;
        CsvRow {
            date: utils::format_date(point.date),
            price: m.price,
            tvl_usd: m.tvl_usd,
            apy: m.apy,
            apy_base: m.apy_base,
            apy_reward: m.apy_reward,
            il7d: m.il7d,
            volume_usd_1d: m.volume_usd_1d,
            volume_usd_7d: m.volume_usd_7d,
            confidence: m.confidence,
            interpolated: point.interpolated,
        }
    }
}

/// Writes points as CSV with a header row.
///
/// # Arguments
/// * `writer` - Destination.
/// * `points` - Points to export, written in order.
pub fn write_csv<W: std::io::Write>(writer: W, points: &[model::TimeSeriesPoint]) -> anyhow::Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().has_headers(true).from_writer(writer);
    for point in points {
        csv_writer.serialize(CsvRow::from(point))?;
    }
    csv_writer.flush()?;
    anyhow::Ok(())
}

/// Exports points to a CSV file, creating parent directories.
pub fn export_csv<P: AsRef<std::path::Path>>(path: P, points: &[model::TimeSeriesPoint]) -> anyhow::Result<()> {
    utils::ensure_parent_dir_exist(&path)?;
    let file = std::fs::File::create(path.as_ref())?;
    write_csv(std::io::BufWriter::new(file), points)?;
    tracing::info!(path = %path.as_ref().display(), rows = points.len(), "Exported CSV");
    anyhow::Ok(())
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

/// Formats one point for terminal output.
///
/// # Example Output
/// ```text
///  - 2025-09-01  price: 4312.55  conf: 0.99
///  - 2025-09-01  tvl_usd: 18250000.00  apy: 12.40  vol: 530000.00 (filled)
/// ```
pub fn format_point(kind: model::SeriesKind, point: &model::TimeSeriesPoint) -> String {
    let m = &point.metrics;
    let mut line = format!(
        " - {}  {}: {}",
        utils::format_date(point.date),
        kind.primary_label(),
        fmt_opt(kind.primary(m))
    );
    match kind {
        model::SeriesKind::Token => {
            if m.confidence.is_some() {
                line.push_str(&format!("  conf: {}", fmt_opt(m.confidence)));
            }
        }
        model::SeriesKind::Pool => {
            line.push_str(&format!("  apy: {}  vol: {}", fmt_opt(m.apy), fmt_opt(m.volume_usd_1d)));
        }
    }
    if point.interpolated {
        line.push_str(" (filled)");
    }
    line
}

/// Splits a series into the head and tail shown by [`print_rows`] plus the
/// number of points elided between them.
fn split_rows<T>(points: &[T], count: usize) -> (&[T], usize, &[T]) {
    if points.len() <= count.saturating_mul(2) {
        return (points, 0, &[]);
    }
    let skipped = points.len() - 2 * count;
    (&points[..count], skipped, &points[points.len() - count..])
}

/// Prints the first and last `count` points of a series.
///
/// Short series are printed in full.
pub fn print_rows(kind: model::SeriesKind, points: &[model::TimeSeriesPoint], count: usize) {
    let (head, skipped, tail) = split_rows(points, count);
    for point in head {
        println!("{}", format_point(kind, point));
    }
    if skipped > 0 {
        println!("   ... {} more ...", skipped);
    }
    for point in tail {
        println!("{}", format_point(kind, point));
    }
}

/// Prints the header block for `show`.
pub fn print_summary(
    series: &model::Series,
    window: window::TimeWindow,
    shown: usize,
    summary: Option<&stats::SeriesSummary>,
) {
    println!("📈 {} ({}) - window {}", series.label(), series.kind, window);
    if let Some(chain) = &series.metadata.chain {
        println!("   chain: {}", chain);
    }
    let Some(s) = summary else {
        println!("⚠️ No data available for {} in window {}", series.label(), window);
        return;
    };
    println!(
        "   {} .. {}  ({} points shown of {} in window)",
        utils::format_date(s.start),
        utils::format_date(s.end),
        shown,
        s.records
    );
    println!(
        "   {}: first {:.4}  last {:.4}  min {:.4}  max {:.4}  avg {:.4}",
        series.kind.primary_label(),
        s.first,
        s.last,
        s.min,
        s.max,
        s.avg
    );
    let mut extras = Vec::new();
    if let Some(r) = s.total_return {
        extras.push(format!("return {:+.2}%", r * 100.0));
    }
    if let Some(v) = s.volatility {
        extras.push(format!("volatility {:.4}", v));
    }
    if let Some(c) = s.avg_confidence {
        extras.push(format!("avg confidence {:.2}", c));
    }
    if s.interpolated > 0 {
        extras.push(format!("{} filled days", s.interpolated));
    }
    if !extras.is_empty() {
        println!("   {}", extras.join("  "));
    }
}

/// Formats one row of a comparison table, one right-aligned column per series.
pub fn format_comparison_row(row: &stats::ComparisonRow) -> String {
    let mut line = format!(" - {}", utils::format_date(row.date));
    for value in &row.values {
        line.push_str(&format!(" {:>10}", fmt_opt(*value)));
    }
    line
}

/// Prints a comparison table with the first and last `count` dates.
///
/// # Example Output
/// ```text
/// 📊 BTC vs ETH - window 1Y, 2024-09-02 = 100
///   date               BTC        ETH
///  - 2024-09-02     100.00     100.00
/// ```
pub fn print_comparison(labels: &[&str], window: window::TimeWindow, comparison: &stats::Comparison, count: usize) {
    println!(
        "📊 {} - window {}, {} = 100",
        labels.join(" vs "),
        window,
        utils::format_date(comparison.base_date)
    );
    let mut header = format!("  {:<13}", "date");
    for label in labels {
        header.push_str(&format!(" {:>10}", label));
    }
    println!("{}", header);

    let (head, skipped, tail) = split_rows(&comparison.rows, count);
    for row in head {
        println!("{}", format_comparison_row(row));
    }
    if skipped > 0 {
        println!("   ... {} more ...", skipped);
    }
    for row in tail {
        println!("{}", format_comparison_row(row));
    }
}

/// Prints one line per series of a dataset.
pub fn print_series_list(dataset: &model::Dataset) {
    if dataset.is_empty() {
        println!("⚠️ No {} series loaded", dataset.kind);
        return;
    }
    for series in dataset.series.values() {
        let range = match (series.first_date(), series.last_date()) {
            (Some(start), Some(end)) => format!("{} .. {}", utils::format_date(start), utils::format_date(end)),
            _ => "empty".to_string(),
        };
        println!(
            " - {:<16} {:<6} {:>6} records  {}",
            series.id,
            series.kind,
            series.points.len(),
            range
        );
    }
}

/// Prints the corrections applied while loading, one line per affected series.
pub fn print_load_reports<'a, I>(reports: I)
where
    I: IntoIterator<Item = &'a dataset::LoadReport>,
{
    for report in reports.into_iter().filter(|r| !r.is_clean()) {
        let mut notes = Vec::new();
        if report.skipped_dates > 0 {
            notes.push(format!("{} unparseable dates dropped", report.skipped_dates));
        }
        if report.duplicates > 0 {
            notes.push(format!("{} duplicate dates dropped", report.duplicates));
        }
        if report.reordered {
            notes.push("re-sorted by date".to_string());
        }
        println!(
            "⚠️ {}: kept {}/{} records, {}",
            report.series_id,
            report.records_kept,
            report.records_read,
            notes.join(", ")
        );
    }
}

/// Prints one validation result in PASS/FAIL form.
pub fn print_gap_report(id: &str, report: &quality::GapReport) {
    if report.is_empty() {
        println!("  {}: ✗ EMPTY", id);
        return;
    }
    let status = if report.is_complete() { "✓ PASS" } else { "✗ FAIL" };
    println!(
        "  {}: {} ({}/{} days)",
        id, status, report.total_days, report.expected_days
    );
    if !report.missing_days.is_empty() {
        let preview: Vec<String> = report
            .missing_days
            .iter()
            .take(5)
            .map(|d| utils::format_date(*d))
            .collect();
        let more = report.missing_days.len().saturating_sub(preview.len());
        let suffix = if more > 0 { format!(" (+{} more)", more) } else { String::new() };
        println!(
            "    Missing {} days: {}{}",
            report.missing_days.len(),
            preview.join(", "),
            suffix
        );
    }
    if report.duplicates > 0 {
        println!("    {} duplicate dates", report.duplicates);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_csv_export_columns() {
        let mut filled = model::TimeSeriesPoint::new(
            ymd(2025, 1, 2),
            model::Metrics {
                tvl_usd: Some(1500.5),
                apy: Some(3.0),
                ..Default::default()
            },
        );
        filled.interpolated = true;
        let points = vec![
            model::TimeSeriesPoint::new(
                ymd(2025, 1, 1),
                model::Metrics {
                    tvl_usd: Some(1500.5),
                    apy: Some(3.0),
                    volume_usd_1d: Some(12.0),
                    ..Default::default()
                },
            ),
            filled,
        ];

        let mut buf = Vec::new();
        write_csv(&mut buf, &points).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "date,price,tvl_usd,apy,apy_base,apy_reward,il7d,volume_usd_1d,volume_usd_7d,confidence,interpolated"
        );
        assert_eq!(lines[1], "2025-01-01,,1500.5,3.0,,,,12.0,,,false");
        assert_eq!(lines[2], "2025-01-02,,1500.5,3.0,,,,,,,true");
    }

    #[test]
    fn test_split_rows() {
        let points: Vec<u32> = (0..10).collect();
        assert_eq!(split_rows(&points, 2), (&points[..2], 6, &points[8..]));
        assert_eq!(split_rows(&points, 5), (&points[..], 0, &[][..]));
        // A huge row count prints everything instead of overflowing.
        assert_eq!(split_rows(&points, usize::MAX), (&points[..], 0, &[][..]));
    }

    #[test]
    fn test_format_comparison_row() {
        let row = stats::ComparisonRow {
            date: ymd(2025, 1, 2),
            values: vec![Some(100.0), None, Some(87.654)],
        };
        assert_eq!(
            format_comparison_row(&row),
            " - 2025-01-02     100.00          -      87.65"
        );
    }

    #[test]
    fn test_format_point() {
        let point = model::TimeSeriesPoint::new(
            ymd(2025, 9, 1),
            model::Metrics {
                price: Some(4312.554),
                confidence: Some(0.99),
                ..Default::default()
            },
        );
        assert_eq!(
            format_point(model::SeriesKind::Token, &point),
            " - 2025-09-01  price: 4312.55  conf: 0.99"
        );
        assert_eq!(
            format_point(model::SeriesKind::Pool, &point),
            " - 2025-09-01  tvl_usd: -  apy: -  vol: -"
        );
    }
}
