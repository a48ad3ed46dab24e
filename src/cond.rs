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

//! The condition compiler (spec §4.4): lowers a `WHERE`-clause boolean
//! expression into a [`Predicate`]. Comparisons are plain lexicographic
//! byte-string comparisons; there is no numeric coercion, matching the
//! string-only data model (spec §3).

use sqlparser::ast::{BinaryOperator, Expr, UnaryOperator, Value};

use crate::error::{Error, Result};
use crate::eval::Predicate;
use crate::expr::compile_value;
use crate::pattern;
use crate::query::CompileOptions;
use crate::row::Row;

pub fn compile_condition(expr: &Expr, opts: CompileOptions) -> Result<Predicate> {
    match expr {
        Expr::Nested(inner) => compile_condition(inner, opts),

        Expr::Value(Value::Boolean(b)) => Ok(Predicate::constant(*b)),

        Expr::UnaryOp {
            op: UnaryOperator::Not,
            expr: inner,
        } => {
            let inner = compile_condition(inner, opts)?;
            Ok(Predicate::new(move |row: &Row| !inner.evaluate(row)))
        }

        Expr::BinaryOp { left, op, right } => compile_binary_op(left, op, right, opts),

        Expr::RLike {
            negated,
            expr: subject,
            pattern: pattern_expr,
            ..
        } => compile_regexp(subject, pattern_expr, *negated, opts),

        Expr::Like {
            negated,
            expr: subject,
            pattern: pattern_expr,
            escape_char,
            ..
        } => {
            if escape_char.is_some() {
                return Err(Error::UnsupportedLikeEscape);
            }
            compile_like(subject, pattern_expr, *negated, opts)
        }

        other => Err(Error::UnsupportedCondition(other.to_string())),
    }
}

fn compile_binary_op(
    left: &Expr,
    op: &BinaryOperator,
    right: &Expr,
    opts: CompileOptions,
) -> Result<Predicate> {
    match op {
        BinaryOperator::And => {
            let l = compile_condition(left, opts)?;
            let r = compile_condition(right, opts)?;
            Ok(Predicate::new(move |row: &Row| {
                l.evaluate(row) && r.evaluate(row)
            }))
        }
        BinaryOperator::Or => {
            let l = compile_condition(left, opts)?;
            let r = compile_condition(right, opts)?;
            Ok(Predicate::new(move |row: &Row| {
                l.evaluate(row) || r.evaluate(row)
            }))
        }
        BinaryOperator::Eq
        | BinaryOperator::NotEq
        | BinaryOperator::Lt
        | BinaryOperator::LtEq
        | BinaryOperator::Gt
        | BinaryOperator::GtEq => compile_comparison(left, op, right, opts),
        other => Err(Error::UnsupportedOperator(other.to_string())),
    }
}

fn compile_comparison(
    left: &Expr,
    op: &BinaryOperator,
    right: &Expr,
    opts: CompileOptions,
) -> Result<Predicate> {
    let l = compile_value(left, opts)?;
    let r = compile_value(right, opts)?;
    let cmp: fn(&str, &str) -> bool = match op {
        BinaryOperator::Eq => |a, b| a == b,
        BinaryOperator::NotEq => |a, b| a != b,
        BinaryOperator::Lt => |a, b| a < b,
        BinaryOperator::LtEq => |a, b| a <= b,
        BinaryOperator::Gt => |a, b| a > b,
        BinaryOperator::GtEq => |a, b| a >= b,
        _ => unreachable!("filtered by caller"),
    };
    Ok(Predicate::new(move |row: &Row| {
        cmp(&l.evaluate(row), &r.evaluate(row))
    }))
}

/// `REGEXP`/`RLIKE`. Static/dynamic fast path (spec §4.4): a literal
/// pattern compiles once here; a column/expression pattern recompiles
/// per row and fails soft to `false` (or `true` for `NOT ... REGEXP`,
/// since negation is applied after the soft-failure result).
fn compile_regexp(
    subject: &Expr,
    pattern_expr: &Expr,
    negated: bool,
    opts: CompileOptions,
) -> Result<Predicate> {
    let s = compile_value(subject, opts)?;
    let pat = compile_value(pattern_expr, opts)?;
    let static_re = match pat.dispatch_on_static() {
        Some(p) => Some(pattern::compile_static(p)?),
        None => None,
    };
    Ok(Predicate::new(move |row: &Row| {
        let matched = match &static_re {
            Some(re) => re.is_match(&s.evaluate(row)),
            None => pattern::try_compile(&pat.evaluate(row))
                .map(|re| re.is_match(&s.evaluate(row)))
                .unwrap_or(false),
        };
        matched != negated
    }))
}

/// `LIKE`. Converts the pattern to a regex via [`pattern::like_to_regex`],
/// then follows the same static/dynamic split as `REGEXP`.
fn compile_like(
    subject: &Expr,
    pattern_expr: &Expr,
    negated: bool,
    opts: CompileOptions,
) -> Result<Predicate> {
    let s = compile_value(subject, opts)?;
    let pat = compile_value(pattern_expr, opts)?;
    let static_re = match pat.dispatch_on_static() {
        Some(p) => Some(pattern::compile_static(&pattern::like_to_regex(p))?),
        None => None,
    };
    Ok(Predicate::new(move |row: &Row| {
        let matched = match &static_re {
            Some(re) => re.is_match(&s.evaluate(row)),
            None => pattern::try_compile(&pattern::like_to_regex(&pat.evaluate(row)))
                .map(|re| re.is_match(&s.evaluate(row)))
                .unwrap_or(false),
        };
        matched != negated
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlparser::dialect::GenericDialect;
    use sqlparser::parser::Parser;

    fn parse_where(sql: &str) -> Expr {
        let full = format!("SELECT 1 FROM t WHERE {sql}");
        let stmt = Parser::parse_sql(&GenericDialect {}, &full).unwrap();
        match &stmt[0] {
            sqlparser::ast::Statement::Query(q) => match q.body.as_ref() {
                sqlparser::ast::SetExpr::Select(select) => {
                    select.selection.clone().expect("WHERE clause")
                }
                _ => panic!("unexpected body"),
            },
            _ => panic!("unexpected statement"),
        }
    }

    fn row_with(pairs: &[(&str, &str)]) -> Row {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.insert(*k, *v);
        }
        row
    }

    #[test]
    fn and_or_not_short_circuit_logic() {
        let pred = compile_condition(&parse_where("a = '1' AND NOT (b = '2')"), CompileOptions::default()).unwrap();
        let row = row_with(&[("a", "1"), ("b", "3")]);
        assert!(pred.evaluate(&row));
        let row2 = row_with(&[("a", "1"), ("b", "2")]);
        assert!(!pred.evaluate(&row2));
    }

    #[test]
    fn comparisons_are_lexicographic() {
        let pred = compile_condition(&parse_where("a < '2'"), CompileOptions::default()).unwrap();
        assert!(pred.evaluate(&row_with(&[("a", "10")])));
        assert!(!pred.evaluate(&row_with(&[("a", "3")])));
    }

    #[test]
    fn like_percent_wildcard() {
        let pred = compile_condition(&parse_where("a LIKE '%foo%'"), CompileOptions::default()).unwrap();
        assert!(pred.evaluate(&row_with(&[("a", "xxfooyy")])));
        assert!(!pred.evaluate(&row_with(&[("a", "bar")])));
    }

    #[test]
    fn like_escape_clause_is_rejected() {
        let err = compile_condition(&parse_where("a LIKE '%foo%' ESCAPE '\\'"), CompileOptions::default())
            .unwrap_err();
        assert_eq!(err, Error::UnsupportedLikeEscape);
    }

    #[test]
    fn regexp_dynamic_pattern_degrades_to_false_on_bad_pattern() {
        let pred = compile_condition(&parse_where("a REGEXP b"), CompileOptions::default()).unwrap();
        let row = row_with(&[("a", "x"), ("b", "(unterminated")]);
        assert!(!pred.evaluate(&row));
    }
}
