//! `PostgreSQL` row store.
//!
//! Queries are built at runtime with `sqlx::QueryBuilder` because the
//! projection and filters vary per read. Column and table names come from
//! [`Column`] and the validated table setting; every value is a bind
//! parameter. Each row is returned as one `jsonb_build_object(...)` value so
//! that both sources hand the row mapper the same shape.
//!
//! Substring filters fold the column with `unaccent(lower(..))`, so the
//! database needs the `unaccent` extension (`CREATE EXTENSION unaccent`).

use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::{debug, instrument};

use crate::config::RemoteConfig;
use crate::db;

use super::{Column, Filter, RawRow, RowQuery, RowStore, SourceError};

/// Row store over a `PostgreSQL` products table.
#[derive(Debug, Clone)]
pub struct PgRowStore {
    pool: PgPool,
    table: String,
}

impl PgRowStore {
    #[must_use]
    pub const fn new(pool: PgPool, table: String) -> Self {
        Self { pool, table }
    }

    /// Connect a pool for `config`.
    ///
    /// # Errors
    ///
    /// Returns `SourceError::Database` if the connection cannot be established.
    pub async fn connect(config: &RemoteConfig) -> Result<Self, SourceError> {
        let pool = db::create_pool(config).await?;
        Ok(Self::new(pool, config.table.clone()))
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl RowStore for PgRowStore {
    #[instrument(skip(self, query), fields(table = %self.table, limit = query.limit))]
    async fn fetch_rows(&self, query: &RowQuery) -> Result<Vec<RawRow>, SourceError> {
        let mut builder = build_query(&self.table, query);
        let rows = builder.build().fetch_all(&self.pool).await?;

        debug!(rows = rows.len(), "Fetched catalog rows");

        rows.into_iter()
            .map(|row| {
                let value: serde_json::Value = row.try_get("row")?;
                RawRow::try_from(value)
            })
            .collect()
    }
}

/// Render `query` against `table`.
#[must_use]
pub fn build_query<'args>(table: &str, query: &RowQuery) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new("SELECT jsonb_build_object(");

    for (i, column) in query.columns.iter().enumerate() {
        if i > 0 {
            builder.push(", ");
        }
        builder.push(format_args!("'{0}', {0}", column.as_str()));
    }

    builder.push(") AS row FROM ");
    builder.push(table);

    if let Some(filter) = &query.filter {
        builder.push(" WHERE ");
        push_filter(&mut builder, filter);
    }

    builder.push(" ORDER BY created_at DESC NULLS LAST LIMIT ");
    builder.push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX));

    builder
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Eq(column, value) => {
            builder.push(column.as_str());
            builder.push(" = ");
            builder.push_bind(value.clone());
        }
        Filter::Contains { column, needles } => {
            push_contains(builder, *column, needles);
        }
        Filter::AnyContains { columns, needles } => {
            if columns.is_empty() {
                builder.push("FALSE");
                return;
            }
            builder.push("(");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                push_contains(builder, *column, needles);
            }
            builder.push(")");
        }
    }
}

fn push_contains(builder: &mut QueryBuilder<'_, Postgres>, column: Column, needles: &[String]) {
    if needles.is_empty() {
        builder.push("FALSE");
        return;
    }

    if column.is_array() {
        builder.push(format_args!(
            "unaccent(lower(array_to_string({}, ' ')))",
            column.as_str()
        ));
    } else {
        builder.push(format_args!("unaccent(lower({}))", column.as_str()));
    }

    let patterns: Vec<String> = needles
        .iter()
        .map(|needle| format!("%{}%", escape_like(needle)))
        .collect();
    builder.push(" LIKE ANY(");
    builder.push_bind(patterns);
    builder.push(")");
}

/// Escape `LIKE` wildcards so needles match literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
