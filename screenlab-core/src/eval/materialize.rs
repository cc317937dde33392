//! Lazy, memoized materialization of named series for one symbol.

use crate::domain::{Column, Timeframe};
use crate::eval::SymbolHistory;
use crate::indicators::IndicatorRegistry;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-symbol cache of computed series, keyed by (timeframe, canonical
/// name). A failed or impossible computation is cached as `None` so it is
/// attempted once; the consuming statement then reads a missing value and
/// comes out false.
pub(crate) struct SeriesBank<'a> {
    history: &'a SymbolHistory,
    registry: &'a IndicatorRegistry,
    cache: HashMap<(Timeframe, String), Option<Arc<Vec<f64>>>>,
}

impl<'a> SeriesBank<'a> {
    pub(crate) fn new(history: &'a SymbolHistory, registry: &'a IndicatorRegistry) -> Self {
        Self {
            history,
            registry,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn history(&self) -> &'a SymbolHistory {
        self.history
    }

    /// The named series at `timeframe`, computing and caching on first use.
    pub(crate) fn series(
        &mut self,
        timeframe: Timeframe,
        name: &str,
    ) -> Option<Arc<Vec<f64>>> {
        if let Some(entry) = self.cache.get(&(timeframe, name.to_string())) {
            return entry.clone();
        }
        let computed = self.compute(timeframe, name);
        self.cache
            .insert((timeframe, name.to_string()), computed.clone());
        computed
    }

    fn compute(&self, timeframe: Timeframe, name: &str) -> Option<Arc<Vec<f64>>> {
        let table = match self.history.table(timeframe) {
            Some(t) if !t.is_empty() => t,
            _ => {
                tracing::debug!(%timeframe, name, "no history for series");
                return None;
            }
        };
        if let Some(column) = Column::parse(name) {
            return Some(Arc::new(table.column(column)));
        }
        match self.registry.compute(name, table) {
            Ok(series) => Some(Arc::new(series)),
            Err(err) => {
                tracing::debug!(%timeframe, name, %err, "series computation failed");
                None
            }
        }
    }
}
