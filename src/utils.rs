/// Configures a custom Rayon thread pool with specified size.
///
/// Batch commands (validation, gap filling) run on this pool instead of the
/// global one so that `--threads` is honoured.
///
/// # Arguments
/// * `num_threads` - Desired number of threads for the pool.
///
/// # Returns
/// * `Result<ThreadPool>` - Created thread pool or an error if creation fails.
pub fn configure_thread_pool(num_threads: usize) -> anyhow::Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to build thread pool: {}", e))
}

/// Resolves the thread count requested on the command line.
///
/// Requests above the number of logical CPUs are clamped with a warning.
/// `None` falls back to Rayon's default.
pub fn effective_threads(requested: Option<usize>) -> anyhow::Result<usize> {
    match requested {
        Some(n) if n > 0 => {
            let max_threads = num_cpus::get();
            if n > max_threads {
                tracing::warn!("Limiting thread count to {} (max available)", max_threads);
                Ok(max_threads)
            } else {
                Ok(n)
            }
        }
        Some(_) => Err(anyhow::anyhow!("Number of threads must be a positive integer")),
        None => Ok(rayon::current_num_threads()),
    }
}

const TEXT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"];

/// Parses a calendar date from the textual forms found in the data files.
///
/// Accepted inputs, tried in order:
/// - `2025-07-08`
/// - `2025-07-08T12:00:00.000Z` / `2025-07-08T12:00:00Z`
/// - any RFC 3339 timestamp (offset is converted to UTC first)
/// - Unix seconds as a decimal string, e.g. `"1720396800"`
///
/// Only the calendar day is kept; the time of day is discarded.
///
/// # Arguments
/// * `text` - Raw date string from the input file.
///
/// # Returns
/// * `Option<NaiveDate>` - The UTC calendar day, or `None` if no format matched.
pub fn parse_date(text: &str) -> Option<chrono::NaiveDate> {
    let text = text.trim();
    if let Ok(date) = chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    for fmt in TEXT_DATE_FORMATS {
        if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&chrono::Utc).date_naive());
    }
    text.parse::<f64>().ok().and_then(date_from_unix_seconds)
}

/// Converts Unix seconds to a UTC calendar day.
///
/// Values that are not finite or fall outside chrono's range yield `None`.
pub fn date_from_unix_seconds(secs: f64) -> Option<chrono::NaiveDate> {
    if !secs.is_finite() {
        return None;
    }
    chrono::DateTime::from_timestamp(secs.floor() as i64, 0).map(|dt| dt.date_naive())
}

/// Formats a calendar day as `YYYY-MM-DD`.
pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Today's date in UTC, used when no `--as-of` date is given.
pub fn today_utc() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}

/// Creates the parent directory of an output file if it is missing.
pub fn ensure_parent_dir_exist<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    anyhow::Ok(())
}

/// Serializes a date as `YYYY-MM-DD`, the form every output file uses.
pub fn serialize_date<S>(date: &chrono::NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format_date(*date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_date("2025-07-08"), Some(ymd(2025, 7, 8)));
        assert_eq!(parse_date("  2025-07-08 "), Some(ymd(2025, 7, 8)));
    }

    #[test]
    fn test_parse_api_timestamps() {
        assert_eq!(parse_date("2024-03-01T00:00:00.000Z"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T23:59:59Z"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_date("2024-03-01T01:00:00+02:00"), Some(ymd(2024, 2, 29)));
    }

    #[test]
    fn test_parse_unix_seconds() {
        // 2024-07-08 00:00:00 UTC
        assert_eq!(parse_date("1720396800"), Some(ymd(2024, 7, 8)));
        assert_eq!(date_from_unix_seconds(1720396800.5), Some(ymd(2024, 7, 8)));
        assert_eq!(date_from_unix_seconds(f64::NAN), None);
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2025-13-40"), None);
    }

    #[test]
    fn test_effective_threads_rejects_zero() {
        assert!(effective_threads(Some(0)).is_err());
        assert_eq!(effective_threads(Some(1)).unwrap(), 1);
    }
}
