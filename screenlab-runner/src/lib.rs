//! ScreenLab Runner — orchestration around the core engine.
//!
//! Loads screener definitions, resolves the symbol universe, fetches
//! per-symbol history sized from the rule's plan, fans evaluation out
//! across a worker pool, and publishes outcomes. History sources, symbol
//! catalogs, translation persistence, and result sinks are all trait
//! seams so embedders can swap storage without touching scheduling.

pub mod catalog;
pub mod config;
pub mod provider;
pub mod scheduler;
pub mod sink;
pub mod store;

pub use catalog::{CatalogEntry, CsvSymbolCatalog, StaticCatalog, SymbolCatalog};
pub use config::{RunnerConfig, ScreenerDef};
pub use provider::{CancelToken, CsvHistoryProvider, DataError, HistoryProvider, StaticHistoryProvider};
pub use scheduler::Screen;
pub use sink::{JsonDirSink, LogSink, ResultSink, ScreenOutcome};
pub use store::{JsonFileStore, NullStore, TranslationStore};
