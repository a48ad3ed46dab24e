// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The query planner (spec §4.5) and row executor (spec §4.6): parses a
//! single `SELECT`/`WHERE` statement into a reusable, thread-shareable
//! [`Query`], then applies it to rows one at a time.

use sqlparser::ast::{SelectItem, SetExpr, Statement};
use sqlparser::dialect::Dialect;
use sqlparser::parser::Parser;

use crate::cond::compile_condition;
use crate::error::{Error, Result};
use crate::eval::{Predicate, ValueEvaluator};
use crate::expr::{canonical_source, compile_value};
use crate::row::Row;

/// Compile-time options. Mirrors the host's `NoKeyError` setting.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// When `true`, a missing column referenced by the query is logged at
    /// `warn` level each time it is looked up (spec §3/§6). The column
    /// still evaluates to the empty string either way; this only controls
    /// the diagnostic.
    pub no_key_error: bool,
}

/// A compiled `SELECT ... FROM ... [WHERE ...]` statement.
///
/// `Query` is `Send + Sync` (every evaluator closure is an
/// `Arc<dyn Fn(...) + Send + Sync>`), so a single compiled plan can be
/// shared across worker threads without locking (spec §5).
#[derive(Clone)]
pub struct Query {
    projection: Vec<(String, ValueEvaluator)>,
    predicate: Predicate,
    source_sql: String,
}

impl Query {
    /// Parses `sql` with `dialect` and compiles it into a `Query`.
    ///
    /// Exactly one statement, and that statement must be a `SELECT`; more
    /// than one statement (e.g. `a; b`) is rejected rather than silently
    /// compiling only the first, since spec's surface is a single query.
    pub fn compile(sql: &str, dialect: &dyn Dialect, opts: CompileOptions) -> Result<Query> {
        if sql.trim().is_empty() {
            return Err(Error::EmptyQuery);
        }
        let mut statements = Parser::parse_sql(dialect, sql)?;
        if statements.len() != 1 {
            return Err(Error::NotASelect);
        }
        let statement = statements.remove(0);
        let query = match statement {
            Statement::Query(q) => q,
            _ => return Err(Error::NotASelect),
        };
        let select = match *query.body {
            SetExpr::Select(select) => select,
            _ => return Err(Error::NotASelect),
        };

        let mut projection = Vec::with_capacity(select.projection.len());
        for item in &select.projection {
            let (key, expr) = match item {
                SelectItem::UnnamedExpr(expr) => (canonical_source(expr), expr),
                SelectItem::ExprWithAlias { expr, alias } => (alias.value.clone(), expr),
                other => {
                    return Err(Error::NotAnAliasedExpr(other.to_string()));
                }
            };
            projection.push((key, compile_value(expr, opts)?));
        }

        let predicate = match &select.selection {
            Some(expr) => compile_condition(expr, opts)?,
            None => Predicate::constant(true),
        };

        Ok(Query {
            projection,
            predicate,
            source_sql: sql.to_string(),
        })
    }

    /// Applies this query to a single input row.
    ///
    /// `None` means the `WHERE` clause rejected the row (drop it); `Some`
    /// carries the projected output row, built fresh in projection order.
    pub fn eval(&self, row: &Row) -> Option<Row> {
        if !self.predicate.evaluate(row) {
            return None;
        }
        let mut out = Row::new();
        for (key, evaluator) in &self.projection {
            out.insert(key.clone(), evaluator.evaluate(row));
        }
        Some(out)
    }

    /// The exact SQL text this query was compiled from.
    pub fn source_sql(&self) -> &str {
        &self.source_sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;

    fn compile(sql: &str) -> Query {
        Query::compile(sql, &GenericDialect {}, CompileOptions::default()).unwrap()
    }

    fn row_with(pairs: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(*k, *v);
        }
        row
    }

    #[test]
    fn empty_sql_is_rejected() {
        let err = Query::compile("", &GenericDialect {}, CompileOptions::default()).unwrap_err();
        assert_eq!(err, Error::EmptyQuery);
    }

    #[test]
    fn rename_and_duplicate_projection() {
        let q = compile("SELECT a AS x, a AS y FROM t");
        let row = row_with(&[("a", "1")]);
        let out = q.eval(&row).unwrap();
        assert_eq!(out.get("x"), Some("1"));
        assert_eq!(out.get("y"), Some("1"));
    }

    #[test]
    fn where_clause_drops_non_matching_rows() {
        let q = compile("SELECT a FROM t WHERE a = '1'");
        assert!(q.eval(&row_with(&[("a", "1")])).is_some());
        assert!(q.eval(&row_with(&[("a", "2")])).is_none());
    }

    #[test]
    fn literal_projection_uses_canonical_source_as_key() {
        let q = compile("SELECT 'abc', 123 FROM t");
        let out = q.eval(&Row::new()).unwrap();
        assert_eq!(out.get("'abc'"), Some("abc"));
        assert_eq!(out.get("123"), Some("123"));
    }

    #[test]
    fn query_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Query>();
    }
}
