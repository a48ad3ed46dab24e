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

use std::fmt;

/// Errors produced while compiling a query. There is no runtime error type:
/// once a [`crate::Query`] exists, evaluation is fail-soft (see the crate
/// docs) and never returns `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `SQL` option was empty.
    EmptyQuery,
    /// The SQL text did not parse.
    Parse(String),
    /// The parsed statement was not a single `SELECT`.
    NotASelect,
    /// A `SELECT` item was not an aliased expression (e.g. a bare `*`).
    NotAnAliasedExpr(String),
    /// An expression node kind the value compiler does not handle.
    UnsupportedExpression(String),
    /// An expression node kind the condition compiler does not handle.
    UnsupportedCondition(String),
    /// `FROM`/comparison operand referenced an unsupported operator.
    UnsupportedOperator(String),
    /// A function name not present in the scalar handler table.
    UnknownFunction(String),
    /// A function was called with the wrong number of arguments.
    WrongArgumentCount { function: &'static str },
    /// A position where an integer literal was required held something else.
    ExpectedIntegerLiteral { context: &'static str },
    /// `SHA2`'s length argument was not one of `{0, 224, 256, 384, 512}`.
    UnsupportedHashLength(i64),
    /// A statically-known `REGEXP`/`LIKE` pattern failed to compile.
    InvalidPattern { pattern: String, reason: String },
    /// `LIKE ... ESCAPE ...` is not supported; the SQL-to-regex conversion
    /// is unescaped (see the crate docs).
    UnsupportedLikeEscape,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyQuery => write!(f, "SQL can't be empty"),
            Error::Parse(msg) => write!(f, "sql parse error: {msg}"),
            Error::NotASelect => write!(f, "not select stmt"),
            Error::NotAnAliasedExpr(src) => {
                write!(f, "select item is not an aliased expression: {src}")
            }
            Error::UnsupportedExpression(kind) => {
                write!(f, "Unsupported expression type: {kind}")
            }
            Error::UnsupportedCondition(src) => {
                write!(f, "unsupport expression type: {src}")
            }
            Error::UnsupportedOperator(op) => write!(f, "unknown operator: {op}"),
            Error::UnknownFunction(name) => write!(f, "unknown function: {name}"),
            Error::WrongArgumentCount { function } => {
                write!(f, "wrong type/number for arguments to {function}")
            }
            Error::ExpectedIntegerLiteral { context } => {
                write!(f, "expected an integer literal in {context}")
            }
            Error::UnsupportedHashLength(n) => {
                write!(f, "sha2: unsupported hash length {n}")
            }
            Error::InvalidPattern { pattern, reason } => {
                write!(f, "invalid pattern {pattern:?}: {reason}")
            }
            Error::UnsupportedLikeEscape => {
                write!(f, "LIKE ... ESCAPE ... is not supported")
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<sqlparser::parser::ParserError> for Error {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Error::Parse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
