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

//! The expression compiler (spec §4.3): lowers a value-producing AST node
//! into a [`ValueEvaluator`]. Type-directed on the `Expr` variant; anything
//! not listed here is a compile error, not a fallback.

use sqlparser::ast::{Expr, Ident, Value};

use crate::error::{Error, Result};
use crate::eval::ValueEvaluator;
use crate::functions;
use crate::query::CompileOptions;
use crate::row::Row;

/// Compiles a value expression. Used both for top-level `SELECT` items and
/// recursively for function arguments, `CASE` branches, etc.
pub fn compile_value(expr: &Expr, opts: CompileOptions) -> Result<ValueEvaluator> {
    match expr {
        Expr::Nested(inner) => compile_value(inner, opts),

        Expr::Value(value) => Ok(ValueEvaluator::Static(literal_text(value))),

        Expr::Identifier(ident) => Ok(column_ref(&ident.value, opts)),

        Expr::CompoundIdentifier(parts) => {
            let name = parts
                .last()
                .map(|ident: &Ident| ident.value.clone())
                .ok_or_else(|| Error::UnsupportedExpression("empty compound identifier".into()))?;
            Ok(column_ref(&name, opts))
        }

        Expr::Function(func) => functions::compile_call(func, opts),

        Expr::Substring {
            expr: inner,
            substring_from,
            substring_for,
            ..
        } => compile_substring(
            inner,
            substring_from.as_deref(),
            substring_for.as_deref(),
            opts,
        ),

        Expr::Case {
            operand,
            conditions,
            results,
            else_result,
        } => compile_case(
            operand.as_deref(),
            conditions,
            results,
            else_result.as_deref(),
            opts,
        ),

        other => Err(Error::UnsupportedExpression(other.to_string())),
    }
}

/// A column reference (spec §4.3). Missing keys degrade to the empty
/// string always; when `opts.no_key_error` is set, a lookup miss also
/// emits one `SQL_FIND_ALARM` warning per evaluation through the `log`
/// facade, mirroring the host's logging collaborator (spec §3/§6).
fn column_ref(name: &str, opts: CompileOptions) -> ValueEvaluator {
    let name = name.to_string();
    ValueEvaluator::dynamic(move |row: &Row| match row.get(&name) {
        Some(value) => value.to_string(),
        None => {
            if opts.no_key_error {
                log::warn!(target: "rowql", "SQL_FIND_ALARM cannot find key:{name}");
            }
            String::new()
        }
    })
}

/// Renders a literal's unquoted text per spec §4.3: booleans render as
/// `"1"`/`"0"`, strings carry their unquoted text, numbers their decimal
/// text.
fn literal_text(value: &Value) -> String {
    match value {
        Value::Boolean(b) => {
            if *b {
                "1".to_string()
            } else {
                "0".to_string()
            }
        }
        Value::Number(n, _) => n.clone(),
        Value::SingleQuotedString(s)
        | Value::DoubleQuotedString(s)
        | Value::EscapedStringLiteral(s)
        | Value::NationalStringLiteral(s)
        | Value::SingleQuotedByteStringLiteral(s)
        | Value::DoubleQuotedByteStringLiteral(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Renders the *canonical source text* of an expression, used as the
/// default output key for an unaliased `SELECT` item (spec §4.5/§8's "key
/// default" property, e.g. `'abc'`, `123`, `1.23`, `MD5(idfa)`).
///
/// This intentionally does not delegate to `sqlparser`'s own `Display`
/// impl: the host's dialect may preserve original quote characters, while
/// this core always renders string literals with single quotes, matching
/// the historical MySQL-library behavior the spec's examples assume.
pub fn canonical_source(expr: &Expr) -> String {
    match expr {
        Expr::Nested(inner) => canonical_source(inner),
        Expr::Value(Value::Boolean(b)) => {
            if *b {
                "true".to_string()
            } else {
                "false".to_string()
            }
        }
        Expr::Value(Value::Number(n, _)) => n.clone(),
        Expr::Value(Value::SingleQuotedString(s))
        | Expr::Value(Value::DoubleQuotedString(s))
        | Expr::Value(Value::EscapedStringLiteral(s)) => format!("'{s}'"),
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(parts) => parts
            .iter()
            .map(|i| i.value.as_str())
            .collect::<Vec<_>>()
            .join("."),
        Expr::Function(func) => {
            let name = func
                .name
                .0
                .last()
                .map(|i| i.value.clone())
                .unwrap_or_default();
            let args = functions_args_source(func);
            format!("{name}({args})")
        }
        other => other.to_string(),
    }
}

fn functions_args_source(func: &sqlparser::ast::Function) -> String {
    use sqlparser::ast::{FunctionArg, FunctionArgExpr, FunctionArguments};
    let list = match &func.args {
        FunctionArguments::List(list) => list,
        _ => return String::new(),
    };
    list.args
        .iter()
        .filter_map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Some(canonical_source(e)),
            FunctionArg::Named {
                arg: FunctionArgExpr::Expr(e),
                ..
            } => Some(canonical_source(e)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `SUBSTR(s FROM p [FOR l])`. `p`/`l` are integer literals evaluated at
/// compile time; `s` is compiled recursively.
fn compile_substring(
    subject: &Expr,
    from: Option<&Expr>,
    for_len: Option<&Expr>,
    opts: CompileOptions,
) -> Result<ValueEvaluator> {
    let pos = from
        .ok_or_else(|| Error::UnsupportedExpression("SUBSTRING without FROM".into()))
        .and_then(|e| int_literal(e, "SUBSTRING FROM"))?;
    let s = compile_value(subject, opts)?;

    match for_len {
        None => Ok(match s.dispatch_on_static() {
            Some(value) => ValueEvaluator::Static(functions::mysql_substr_no_len(value, pos)),
            None => ValueEvaluator::dynamic(move |row: &Row| {
                functions::mysql_substr_no_len(&s.evaluate(row), pos)
            }),
        }),
        Some(for_expr) => {
            let len = int_literal(for_expr, "SUBSTRING FOR")?;
            Ok(match s.dispatch_on_static() {
                Some(value) => {
                    ValueEvaluator::Static(functions::mysql_substr_with_len(value, pos, len))
                }
                None => ValueEvaluator::dynamic(move |row: &Row| {
                    functions::mysql_substr_with_len(&s.evaluate(row), pos, len)
                }),
            })
        }
    }
}

fn int_literal(expr: &Expr, context: &'static str) -> Result<i64> {
    use sqlparser::ast::UnaryOperator;
    match expr {
        Expr::Value(Value::Number(n, _)) => n
            .parse::<i64>()
            .map_err(|_| Error::ExpectedIntegerLiteral { context }),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => int_literal(expr, context).map(|n| -n),
        Expr::Nested(inner) => int_literal(inner, context),
        _ => Err(Error::ExpectedIntegerLiteral { context }),
    }
}

/// `CASE` compiler (spec §4.3). Two shapes sharing one evaluation loop:
/// value-form (`operand.is_some()`, each condition compared for equality
/// against the operand) and search-form (each condition is a boolean
/// expression compiled by the condition compiler). Branches are tried in
/// source order; first match wins (spec §8's "CASE first-match" property).
fn compile_case(
    operand: Option<&Expr>,
    conditions: &[Expr],
    results: &[Expr],
    else_result: Option<&Expr>,
    opts: CompileOptions,
) -> Result<ValueEvaluator> {
    let results: Vec<ValueEvaluator> = results
        .iter()
        .map(|e| compile_value(e, opts))
        .collect::<Result<_>>()?;
    let else_evaluator = else_result.map(|e| compile_value(e, opts)).transpose()?;

    let branches: Vec<crate::eval::Predicate> = match operand {
        Some(operand_expr) => {
            let subject = compile_value(operand_expr, opts)?;
            conditions
                .iter()
                .map(|cond_expr| {
                    let value = compile_value(cond_expr, opts)?;
                    let subject = subject.clone();
                    Ok(crate::eval::Predicate::new(move |row: &Row| {
                        subject.evaluate(row) == value.evaluate(row)
                    }))
                })
                .collect::<Result<Vec<_>>>()?
        }
        None => conditions
            .iter()
            .map(|e| crate::cond::compile_condition(e, opts))
            .collect::<Result<Vec<_>>>()?,
    };

    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        for (branch, result) in branches.iter().zip(results.iter()) {
            if branch.evaluate(row) {
                return result.evaluate(row);
            }
        }
        match &else_evaluator {
            Some(e) => e.evaluate(row),
            None => String::new(),
        }
    }))
}
