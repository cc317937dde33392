//! Screen scheduling: translate once, fan evaluation out per symbol,
//! reduce to a match set or a ranking.
//!
//! Per-symbol work is independent and read-only over the shared
//! translation, so it parallelizes with rayon without coordination. A
//! symbol that cannot be fetched or evaluated is skipped with a log line;
//! one bad symbol never fails the screen. Only translation failures and
//! store I/O abort a run.

use crate::catalog::CatalogEntry;
use crate::config::ScreenerDef;
use crate::provider::{CancelToken, HistoryProvider};
use crate::sink::ScreenOutcome;
use crate::store::TranslationStore;
use anyhow::{bail, Context, Result};
use rayon::prelude::*;
use screenlab_core::domain::Timeframe;
use screenlab_core::eval::{Evaluator, SymbolHistory};
use screenlab_core::indicators::IndicatorRegistry;
use screenlab_core::lang::{
    compile, IndicatorReference, RankBasis, RankDirection, StatementIr, Translation, Translator,
};
use screenlab_core::patterns::PatternRegistry;
use screenlab_core::plan::TimeframeNeeds;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Fetch twice the requirement plus a pad, so warmup NaN and ragged
/// trading calendars never starve an access that the plan promised.
const FETCH_PAD: usize = 50;

/// Daily tables shorter than this are noise (fresh listings, halted
/// symbols) and drop the symbol before evaluation. Coarser frames may
/// legitimately be thin; their statements just read as false.
const MIN_BARS: usize = 3;

fn fetch_depth(need: usize) -> usize {
    need * 2 + FETCH_PAD
}

/// Shared, read-only context for running screeners.
pub struct Screen<'a> {
    pub indicators: &'a IndicatorRegistry,
    pub patterns: &'a PatternRegistry,
    pub translator: &'a Translator,
    pub provider: &'a dyn HistoryProvider,
    pub store: &'a dyn TranslationStore,
    /// Checked at the fetch boundary; a cancelled screen aborts with an
    /// error after in-flight tasks drain.
    pub cancel: Option<&'a CancelToken>,
}

enum Verdict {
    Matched,
    NotMatched,
    Skipped,
}

impl Screen<'_> {
    /// Run one screener over a universe.
    pub fn run(&self, def: &ScreenerDef, universe: &[CatalogEntry]) -> Result<ScreenOutcome> {
        let fingerprint = def.fingerprint();
        let translation = match self.store.load(&def.id, &fingerprint)? {
            Some(t) => {
                tracing::debug!(id = %def.id, "reusing stored translation");
                t
            }
            None => {
                let t = compile(&def.expression, self.translator)
                    .with_context(|| format!("screener '{}' failed to translate", def.id))?;
                if let Err(err) = self.store.save(&def.id, &fingerprint, &t) {
                    tracing::warn!(id = %def.id, %err, "failed to persist translation");
                }
                t
            }
        };

        if let Some(StatementIr::TopBottom {
            direction,
            count,
            basis,
        }) = translation.ranking()
        {
            self.run_ranking(def, universe, *direction, *count, basis)
        } else {
            self.run_filter(def, universe, &translation)
        }
    }

    fn run_filter(
        &self,
        def: &ScreenerDef,
        universe: &[CatalogEntry],
        translation: &Translation,
    ) -> Result<ScreenOutcome> {
        let needs = TimeframeNeeds::from_translation(translation);
        let evaluator = Evaluator::new(self.indicators, self.patterns);
        let provider = self.provider;

        let cancel = self.cancel;

        let verdicts: Vec<Verdict> = universe
            .par_iter()
            .map(|entry| {
                if cancel.is_some_and(CancelToken::is_cancelled) {
                    return Verdict::Skipped;
                }
                let Some(history) = fetch_history(provider, &entry.symbol, &needs) else {
                    return Verdict::Skipped;
                };
                match evaluator.evaluate(translation, &history) {
                    Ok(true) => Verdict::Matched,
                    Ok(false) => Verdict::NotMatched,
                    Err(err) => {
                        tracing::warn!(symbol = %entry.symbol, %err, "evaluation failed");
                        Verdict::Skipped
                    }
                }
            })
            .collect();
        if cancel.is_some_and(CancelToken::is_cancelled) {
            bail!("screen '{}' cancelled", def.id);
        }

        let mut matches = Vec::new();
        let mut skipped = 0usize;
        for (entry, verdict) in universe.iter().zip(&verdicts) {
            match verdict {
                Verdict::Matched => matches.push(entry.symbol.clone()),
                Verdict::NotMatched => {}
                Verdict::Skipped => skipped += 1,
            }
        }
        Ok(ScreenOutcome {
            screener_id: def.id.clone(),
            matches,
            evaluated: universe.len() - skipped,
            skipped,
        })
    }

    fn run_ranking(
        &self,
        def: &ScreenerDef,
        universe: &[CatalogEntry],
        direction: RankDirection,
        count: usize,
        basis: &RankBasis,
    ) -> Result<ScreenOutcome> {
        let scores: Vec<Option<f64>> = match basis {
            // Catalog scalar: no history, no fan-out worth the name.
            // Symbols the catalog never scored drop out of the ranking.
            RankBasis::IbdRelativeStrength => universe
                .iter()
                .map(|e| e.ibd_relative_strength.filter(|v| !v.is_nan()))
                .collect(),
            // Indicator basis: an unscorable symbol ranks at 0 rather
            // than dropping, so bottom-N can surface dormant symbols.
            RankBasis::Indicator(reference) => {
                let evaluator = Evaluator::new(self.indicators, self.patterns);
                let provider = self.provider;
                let cancel = self.cancel;
                universe
                    .par_iter()
                    .map(|entry| {
                        if cancel.is_some_and(CancelToken::is_cancelled) {
                            return None;
                        }
                        Some(score_symbol(provider, &evaluator, basis, reference, entry))
                    })
                    .collect()
            }
        };
        if self.cancel.is_some_and(CancelToken::is_cancelled) {
            bail!("screen '{}' cancelled", def.id);
        }

        let evaluated = scores.iter().flatten().count();
        let matches = select(universe, &scores, direction, count);
        Ok(ScreenOutcome {
            screener_id: def.id.clone(),
            matches,
            evaluated,
            skipped: universe.len() - evaluated,
        })
    }
}

/// One ranked candidate. Greater = better; ties prefer earlier catalog
/// positions so reruns are reproducible.
#[derive(Debug, PartialEq)]
struct Ranked {
    key: f64,
    index: usize,
}

impl Eq for Ranked {}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .partial_cmp(&other.key)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Partial selection of the best `count` symbols via a bounded min-heap,
/// O(universe · log count).
fn select(
    universe: &[CatalogEntry],
    scores: &[Option<f64>],
    direction: RankDirection,
    count: usize,
) -> Vec<String> {
    let mut kept: BinaryHeap<Reverse<Ranked>> = BinaryHeap::with_capacity(count + 1);
    for (index, score) in scores.iter().enumerate() {
        let Some(score) = score else { continue };
        let key = match direction {
            RankDirection::Top => *score,
            RankDirection::Bottom => -score,
        };
        kept.push(Reverse(Ranked { key, index }));
        if kept.len() > count {
            kept.pop();
        }
    }
    let mut kept: Vec<Ranked> = kept.into_iter().map(|Reverse(r)| r).collect();
    kept.sort_by(|a, b| b.cmp(a));
    kept.into_iter()
        .map(|r| universe[r.index].symbol.clone())
        .collect()
}

fn fetch_history(
    provider: &dyn HistoryProvider,
    symbol: &str,
    needs: &TimeframeNeeds,
) -> Option<SymbolHistory> {
    let mut history = SymbolHistory::new();
    for (timeframe, need) in needs.iter() {
        match provider.fetch(symbol, timeframe, fetch_depth(need)) {
            Ok(table) if table.len() >= MIN_BARS => history.insert(timeframe, table),
            Ok(table) => {
                tracing::debug!(symbol, %timeframe, bars = table.len(), "history too short");
                if timeframe == Timeframe::Daily {
                    return None;
                }
            }
            Err(err) => {
                tracing::debug!(symbol, %timeframe, %err, "history unavailable");
                if timeframe == Timeframe::Daily {
                    return None;
                }
            }
        }
    }
    Some(history)
}

/// Indicator-basis ranking scalar. Anything unscorable (missing history,
/// warmup NaN, failed fetch) scores 0.
fn score_symbol(
    provider: &dyn HistoryProvider,
    evaluator: &Evaluator<'_>,
    basis: &RankBasis,
    reference: &IndicatorReference,
    entry: &CatalogEntry,
) -> f64 {
    let table = match provider.fetch(
        &entry.symbol,
        reference.timeframe,
        fetch_depth(reference.max_lookback),
    ) {
        Ok(t) if t.len() >= MIN_BARS => t,
        Ok(_) | Err(_) => {
            tracing::debug!(symbol = %entry.symbol, "no usable history for ranking");
            return 0.0;
        }
    };
    let mut history = SymbolHistory::new();
    history.insert(reference.timeframe, table);
    match evaluator.ranking_score(basis, &history) {
        Ok(score) => score.filter(|v| !v.is_nan()).unwrap_or(0.0),
        Err(err) => {
            tracing::warn!(symbol = %entry.symbol, %err, "ranking score failed");
            0.0
        }
    }
}
