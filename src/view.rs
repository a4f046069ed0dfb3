use crate::cache;
use crate::error::DatasetError;
use crate::model;
use crate::window;

/// Identifies one memoized reduction.
///
/// The series length is part of the key so that a reloaded, longer series
/// never hits a reduction computed for the old one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReductionKey {
    pub series_id: String,
    pub window: window::TimeWindow,
    pub len: usize,
}

/// Reduced series as handed to the presentation layer.
pub type Reduced = std::rc::Rc<[model::TimeSeriesPoint]>;

/// Cache type shared by every [`WindowedView`] in a process.
pub type ReductionCache<C = cache::SystemClock> = cache::TtlCache<ReductionKey, Reduced, C>;

/// Parameters of a view that do not change between requests.
#[derive(Debug, Clone, Copy)]
pub struct ViewSettings {
    pub today: chrono::NaiveDate,
    pub density: window::DensityLimit,
    pub ttl: std::time::Duration,
}

/// Serves windowed, display-ready series out of a dataset.
///
/// The view owns neither the data nor the cache; both are lent by the
/// caller so that one cache can outlive many views.
pub struct WindowedView<'a, C: cache::Clock = cache::SystemClock> {
    dataset: &'a model::Dataset,
    cache: &'a mut ReductionCache<C>,
    settings: ViewSettings,
}

impl<'a, C: cache::Clock> WindowedView<'a, C> {
    pub fn new(dataset: &'a model::Dataset, cache: &'a mut ReductionCache<C>, settings: ViewSettings) -> Self {
        Self {
            dataset,
            cache,
            settings,
        }
    }

    /// Returns the display series for `series_id` under `window`, reusing a
    /// cached reduction when one is still live.
    ///
    /// # Errors
    /// * `DatasetError::UnknownSeries` if the dataset has no such series.
    pub fn series(&mut self, series_id: &str, window: window::TimeWindow) -> Result<Reduced, DatasetError> {
        let series = self
            .dataset
            .get(series_id)
            .ok_or_else(|| DatasetError::UnknownSeries(series_id.to_string()))?;
        let key = ReductionKey {
            series_id: series_id.to_string(),
            window,
            len: series.points.len(),
        };

        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(series = series_id, %window, "Reduction cache hit");
            return Ok(hit.clone());
        }

        let settings = self.settings;
        let reduced: Reduced =
            window::reduce_for_display(&series.points, window, settings.today, settings.density).into();
        tracing::debug!(
            series = series_id,
            %window,
            input = series.points.len(),
            output = reduced.len(),
            "Reduced series"
        );
        self.cache.set(key, reduced.clone(), settings.ttl);
        Ok(reduced)
    }
}
