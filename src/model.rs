/// Which family a series belongs to.
///
/// Token series carry prices, pool series carry liquidity metrics. The kind
/// decides which metric is treated as the primary one for summaries and
/// exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Token,
    Pool,
}

impl SeriesKind {
    /// Returns the primary metric of a point for this kind of series.
    pub fn primary(&self, metrics: &Metrics) -> Option<f64> {
        match self {
            SeriesKind::Token => metrics.price,
            SeriesKind::Pool => metrics.tvl_usd,
        }
    }

    /// Column label used for the primary metric in tables and CSV headers.
    pub fn primary_label(&self) -> &'static str {
        match self {
            SeriesKind::Token => "price",
            SeriesKind::Pool => "tvl_usd",
        }
    }
}

impl std::fmt::Display for SeriesKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeriesKind::Token => write!(f, "token"),
            SeriesKind::Pool => write!(f, "pool"),
        }
    }
}

/// Numeric observations recorded for one day.
///
/// Every field is optional: token files only carry `price` and `confidence`,
/// pool files carry the liquidity and yield fields.
///
/// Input is read through the loader's raw record type; this struct is only
/// ever serialized.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tvl_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy_base: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apy_reward: Option<f64>,
    /// Seven-day impermanent loss, as reported by the pool source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub il7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_usd_1d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_usd_7d: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// One dated observation in canonical form.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TimeSeriesPoint {
    #[serde(serialize_with = "crate::utils::serialize_date")]
    pub date: chrono::NaiveDate,
    #[serde(flatten)]
    pub metrics: Metrics,
    /// Set on points synthesized by gap filling.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub interpolated: bool,
}

impl TimeSeriesPoint {
    pub fn new(date: chrono::NaiveDate, metrics: Metrics) -> Self {
        Self {
            date,
            metrics,
            interpolated: false,
        }
    }
}

/// Descriptive fields carried alongside a series.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct SeriesMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub underlying_tokens: Vec<String>,
}

/// A normalized, date-ordered series for one token or pool.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub id: String,
    pub kind: SeriesKind,
    pub metadata: SeriesMetadata,
    pub points: Vec<TimeSeriesPoint>,
}

impl Series {
    pub fn first_date(&self) -> Option<chrono::NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<chrono::NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Display name: the metadata symbol when present, else the map key.
    pub fn label(&self) -> &str {
        self.metadata.symbol.as_deref().unwrap_or(&self.id)
    }
}

/// All series read from one input file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub kind: SeriesKind,
    pub series: std::collections::BTreeMap<String, Series>,
}

impl Dataset {
    pub fn empty(kind: SeriesKind) -> Self {
        Self {
            kind,
            series: std::collections::BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Series> {
        self.series.get(id)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }
}
