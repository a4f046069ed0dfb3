use crate::error::DatasetError;
use crate::model;
use crate::utils;

/// Date field as it appears in the input: text in one of several formats,
/// or Unix seconds.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    Unix(f64),
}

impl RawDate {
    fn to_date(&self) -> Option<chrono::NaiveDate> {
        match self {
            RawDate::Text(text) => utils::parse_date(text),
            RawDate::Unix(secs) => utils::date_from_unix_seconds(*secs),
        }
    }
}

/// Represents a single per-day record from an input file.
///
/// Token and pool exports disagree on field names, so every synonym seen in
/// the data files is folded here with serde aliases. Nothing past this
/// struct branches on field naming.
#[derive(Debug, serde::Deserialize)]
struct RawRecord {
    #[serde(default, alias = "timestamp")]
    date: Option<RawDate>,
    #[serde(default, alias = "close")]
    price: Option<f64>,
    #[serde(default, alias = "tvlUsd", alias = "tvl_usd")]
    tvl: Option<f64>,
    #[serde(default, alias = "apyPct")]
    apy: Option<f64>,
    #[serde(default, alias = "apyBase")]
    apy_base: Option<f64>,
    #[serde(default, alias = "apyReward")]
    apy_reward: Option<f64>,
    #[serde(default)]
    il7d: Option<f64>,
    #[serde(default, alias = "volumeUsd1d", alias = "volume")]
    volume_usd_1d: Option<f64>,
    #[serde(default, alias = "volumeUsd7d")]
    volume_usd_7d: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    interpolated: bool,
}

impl RawRecord {
    fn metrics(&self) -> model::Metrics {
        model::Metrics {
            price: self.price,
            tvl_usd: self.tvl,
            apy: self.apy,
            apy_base: self.apy_base,
            apy_reward: self.apy_reward,
            il7d: self.il7d,
            volume_usd_1d: self.volume_usd_1d,
            volume_usd_7d: self.volume_usd_7d,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
struct RawDateRange {
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    end: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
struct RawMetadata {
    #[serde(default)]
    symbol: Option<String>,
    #[serde(default)]
    chain: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default, alias = "poolId")]
    pool_id: Option<String>,
    #[serde(default, alias = "underlyingTokens")]
    underlying_tokens: Option<Vec<String>>,
    #[serde(default, alias = "recordCount")]
    record_count: Option<usize>,
    #[serde(default, alias = "dateRange")]
    date_range: Option<RawDateRange>,
}

#[derive(Debug, serde::Deserialize)]
struct RawSeries {
    #[serde(default)]
    metadata: Option<RawMetadata>,
    #[serde(default, alias = "timeSeries")]
    timeseries: Vec<RawRecord>,
}

/// What happened to one series during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub series_id: String,
    pub records_read: usize,
    pub records_kept: usize,
    /// Records dropped because their date was missing or unparseable.
    pub skipped_dates: usize,
    /// Records dropped because an earlier record had the same date.
    pub duplicates: usize,
    /// Input was not in ascending date order.
    pub reordered: bool,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_dates == 0 && self.duplicates == 0 && !self.reordered
    }
}

/// Converts one raw series into canonical form.
///
/// Records with a missing or unparseable date are dropped. The rest are
/// sorted by date (stable, so input order decides ties) and only the first
/// record of each date is kept.
fn normalize_series(id: &str, kind: model::SeriesKind, raw: RawSeries) -> (model::Series, LoadReport) {
    let mut report = LoadReport {
        series_id: id.to_string(),
        records_read: raw.timeseries.len(),
        ..Default::default()
    };

    let mut points = Vec::with_capacity(raw.timeseries.len());
    for record in &raw.timeseries {
        match record.date.as_ref().and_then(RawDate::to_date) {
            Some(date) => points.push(model::TimeSeriesPoint {
                date,
                metrics: record.metrics(),
                interpolated: record.interpolated,
            }),
            None => {
                tracing::warn!(series = id, date = ?record.date, "Skipping record with unparseable date");
                report.skipped_dates += 1;
            }
        }
    }

    report.reordered = points.windows(2).any(|w| w[0].date > w[1].date);
    points.sort_by_key(|p| p.date);
    let before = points.len();
    points.dedup_by_key(|p| p.date);
    report.duplicates = before - points.len();
    report.records_kept = points.len();

    let metadata = raw.metadata.unwrap_or_default();
    if let Some(declared) = metadata.record_count {
        if declared != report.records_read {
            tracing::debug!(
                series = id,
                declared,
                actual = report.records_read,
                "Declared record count does not match timeseries length"
            );
        }
    }
    if let Some(range) = &metadata.date_range {
        tracing::trace!(series = id, start = ?range.start, end = ?range.end, "Declared date range");
    }

    let series = model::Series {
        id: id.to_string(),
        kind,
        metadata: model::SeriesMetadata {
            symbol: metadata.symbol,
            chain: metadata.chain,
            protocol: metadata.protocol,
            pool_id: metadata.pool_id,
            underlying_tokens: metadata.underlying_tokens.unwrap_or_default(),
        },
        points,
    };
    (series, report)
}

/// Parses the JSON text of a dataset file.
///
/// The top level must be an object keyed by series id. Entries that are
/// `null` or do not have the expected shape are skipped with a warning so
/// that one broken entry does not hide the rest of the file.
///
/// # Arguments
/// * `text` - File contents.
/// * `kind` - Whether the file holds token or pool series.
/// * `path` - Source path, used in error messages only.
///
/// # Returns
/// * `Result<(Dataset, Vec<LoadReport>), DatasetError>` - Normalized series and one report per kept series.
pub fn parse_dataset(
    text: &str,
    kind: model::SeriesKind,
    path: &std::path::Path,
) -> Result<(model::Dataset, Vec<LoadReport>), DatasetError> {
    let entries: std::collections::BTreeMap<String, serde_json::Value> =
        serde_json::from_str(text).map_err(|source| DatasetError::Json {
            path: path.to_path_buf(),
            source,
        })?;

    let mut dataset = model::Dataset::empty(kind);
    let mut reports = Vec::with_capacity(entries.len());

    for (id, value) in entries {
        if value.is_null() {
            tracing::warn!(series = %id, "Skipping empty series entry");
            continue;
        }
        let raw: RawSeries = match serde_json::from_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(series = %id, error = %e, "Skipping malformed series entry");
                continue;
            }
        };
        let (series, report) = normalize_series(&id, kind, raw);
        if !report.is_clean() {
            tracing::info!(
                series = %id,
                skipped = report.skipped_dates,
                duplicates = report.duplicates,
                reordered = report.reordered,
                "Normalized series with corrections"
            );
        }
        dataset.series.insert(id, series);
        reports.push(report);
    }

    Ok((dataset, reports))
}

/// Reads and normalizes a dataset file.
///
/// # Arguments
/// * `path` - Path to the JSON file.
/// * `kind` - Whether the file holds token or pool series.
///
/// # Errors
/// * `DatasetError::Io` if the file cannot be read.
/// * `DatasetError::Json` if the top level is not a JSON object.
pub fn load_dataset<P: AsRef<std::path::Path>>(
    path: P,
    kind: model::SeriesKind,
) -> Result<(model::Dataset, Vec<LoadReport>), DatasetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let loaded = parse_dataset(&text, kind, path)?;
    tracing::info!(path = %path.display(), series = loaded.0.len(), %kind, "Loaded dataset");
    Ok(loaded)
}

/// Reads a dataset file, substituting an empty dataset on any failure.
///
/// Presentation code calls this: a missing or corrupt file shows up as
/// "no data" rather than aborting the run.
pub fn load_dataset_or_empty<P: AsRef<std::path::Path>>(
    path: P,
    kind: model::SeriesKind,
) -> (model::Dataset, Vec<LoadReport>) {
    match load_dataset(path, kind) {
        Ok(loaded) => loaded,
        Err(e) => {
            tracing::warn!(error = %e, "Using empty dataset");
            (model::Dataset::empty(kind), Vec::new())
        }
    }
}

#[derive(serde::Serialize)]
struct DateRange {
    start: Option<String>,
    end: Option<String>,
}

#[derive(serde::Serialize)]
struct OutMetadata<'a> {
    #[serde(flatten)]
    base: &'a model::SeriesMetadata,
    kind: model::SeriesKind,
    record_count: usize,
    interpolated_count: usize,
    date_range: DateRange,
}

#[derive(serde::Serialize)]
struct OutSeries<'a> {
    metadata: OutMetadata<'a>,
    timeseries: &'a [model::TimeSeriesPoint],
}

/// Serializes a dataset in canonical form.
///
/// Metadata counts and date ranges are recomputed from the points. The
/// output can be read back with [`load_dataset`].
pub fn to_json(dataset: &model::Dataset) -> anyhow::Result<String> {
    let out: std::collections::BTreeMap<&str, OutSeries> = dataset
        .series
        .iter()
        .map(|(id, series)| {
            let metadata = OutMetadata {
                base: &series.metadata,
                kind: series.kind,
                record_count: series.points.len(),
                interpolated_count: series.points.iter().filter(|p| p.interpolated).count(),
                date_range: DateRange {
                    start: series.first_date().map(utils::format_date),
                    end: series.last_date().map(utils::format_date),
                },
            };
            (
                id.as_str(),
                OutSeries {
                    metadata,
                    timeseries: &series.points,
                },
            )
        })
        .collect();
    Ok(serde_json::to_string_pretty(&out)?)
}

/// Writes a dataset to `path` in canonical form, creating parent directories.
pub fn write_dataset<P: AsRef<std::path::Path>>(dataset: &model::Dataset, path: P) -> anyhow::Result<()> {
    utils::ensure_parent_dir_exist(&path)?;
    std::fs::write(path.as_ref(), to_json(dataset)?)?;
    tracing::info!(path = %path.as_ref().display(), series = dataset.len(), "Wrote dataset");
    anyhow::Ok(())
}
