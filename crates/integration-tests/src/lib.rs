//! Integration tests for the Dram catalog engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dram-integration-tests
//! ```
//!
//! Remote-mode behavior is exercised against [`MemoryRowStore`], an in-memory
//! [`RowStore`] that evaluates substring filters the way the `PostgreSQL`
//! store renders them: `unaccent(lower(column)) LIKE '%needle%'`.
//!
//! # Test Categories
//!
//! - `remote_catalog` - Remote source, projection, slug probing, errors, timeouts
//! - `static_catalog` - Bundled dataset end to end

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;

use dram_core::normalize;

use dram_catalog::{
    CacheKey, CacheValue, CatalogGateway, CatalogService, Column, Filter, RawRow, RemoteCatalog,
    RowQuery, RowStore, SearchMatcher, SourceError, TtlCache, VarietyResolver,
};

/// In-memory products table.
///
/// Clones share state, so a test can keep a handle after moving a clone
/// into a service.
#[derive(Debug, Clone, Default)]
pub struct MemoryRowStore {
    state: Arc<State>,
}

#[derive(Debug, Default)]
struct State {
    rows: Mutex<Vec<RawRow>>,
    queries: Mutex<Vec<RowQuery>>,
    failure: Mutex<Option<String>>,
    delay: Mutex<Option<Duration>>,
    fetches: AtomicUsize,
}

impl MemoryRowStore {
    /// A store holding `rows`, which must be JSON objects.
    ///
    /// # Panics
    ///
    /// Panics if a row is not a JSON object.
    #[must_use]
    pub fn new(rows: Vec<Value>) -> Self {
        let rows = rows
            .into_iter()
            .map(|row| RawRow::try_from(row).expect("fixture rows must be objects"))
            .collect();

        Self {
            state: Arc::new(State {
                rows: Mutex::new(rows),
                ..State::default()
            }),
        }
    }

    /// Make every fetch fail with `SourceError::Unavailable`.
    pub fn fail_with(&self, reason: &str) {
        *lock(&self.state.failure) = Some(reason.to_owned());
    }

    /// Let fetches succeed again.
    pub fn recover(&self) {
        *lock(&self.state.failure) = None;
    }

    /// Delay every fetch.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *lock(&self.state.delay) = delay;
    }

    /// Replace the table contents.
    ///
    /// # Panics
    ///
    /// Panics if a row is not a JSON object.
    pub fn replace_rows(&self, rows: Vec<Value>) {
        *lock(&self.state.rows) = rows
            .into_iter()
            .map(|row| RawRow::try_from(row).expect("fixture rows must be objects"))
            .collect();
    }

    /// Every query received so far.
    #[must_use]
    pub fn queries(&self) -> Vec<RowQuery> {
        lock(&self.state.queries).clone()
    }

    /// Number of fetches, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.state.fetches.load(Ordering::SeqCst)
    }
}

impl RowStore for MemoryRowStore {
    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<RawRow>, SourceError> {
        self.state.fetches.fetch_add(1, Ordering::SeqCst);
        lock(&self.state.queries).push(query.clone());

        let delay = *lock(&self.state.delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(reason) = lock(&self.state.failure).clone() {
            return Err(SourceError::Unavailable(reason));
        }

        let mut rows: Vec<RawRow> = lock(&self.state.rows)
            .iter()
            .filter(|row| query.filter.as_ref().is_none_or(|f| row_matches(row, f)))
            .cloned()
            .collect();

        rows.sort_by(|a, b| created_at(b).cmp(&created_at(a)));

        let keys: Vec<&str> = query.columns.iter().map(|c| c.as_str()).collect();
        Ok(rows
            .into_iter()
            .take(query.limit)
            .map(|row| row.project(&keys))
            .collect())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn created_at(row: &RawRow) -> String {
    row.get(Column::CreatedAt.as_str())
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn row_matches(row: &RawRow, filter: &Filter) -> bool {
    match filter {
        Filter::Eq(column, value) => {
            column_text(row, *column).is_some_and(|text| text == *value)
        }
        Filter::Contains { column, needles } => contains_any(row, *column, needles),
        Filter::AnyContains { columns, needles } => columns
            .iter()
            .any(|column| contains_any(row, *column, needles)),
    }
}

/// Substring match over the folded column text. Needles arrive folded.
fn contains_any(row: &RawRow, column: Column, needles: &[String]) -> bool {
    let Some(text) = column_text(row, column) else {
        return false;
    };
    let text = normalize(&text);
    needles.iter().any(|needle| text.contains(needle.as_str()))
}

fn column_text(row: &RawRow, column: Column) -> Option<String> {
    match row.get(column.as_str())? {
        Value::String(s) => Some(s.clone()),
        Value::Array(values) => Some(
            values
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// A remote-mode service over `store` with small, test-friendly limits.
#[must_use]
pub fn remote_service(store: MemoryRowStore, result_limit: usize) -> CatalogService<MemoryRowStore> {
    let remote = RemoteCatalog::new(store, SearchMatcher::default(), result_limit, 20);

    CatalogService::new(
        CatalogGateway::Remote(remote),
        TtlCache::<CacheKey, CacheValue>::new(Duration::from_secs(60), 100),
        VarietyResolver::default(),
        Duration::from_secs(1),
    )
}
