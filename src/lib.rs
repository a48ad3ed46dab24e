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

//! Compiles a single `SELECT ... FROM ... [WHERE ...]` statement into a
//! reusable, thread-shareable row transformer.
//!
//! A [`Query`] is built once (parsing is delegated entirely to the
//! [`sqlparser`] crate) and then applied to many rows: each `SELECT` item
//! becomes a [`ValueEvaluator`](eval::ValueEvaluator) and the `WHERE`
//! clause a [`Predicate`](eval::Predicate), both compiled ahead of time so
//! that evaluating a row never re-walks the AST or re-parses a regex.
//!
//! ```
//! use rowql::{CompileOptions, Query, Row};
//! use sqlparser::dialect::MySqlDialect;
//!
//! let query = Query::compile(
//!     "SELECT idfa, MD5(idfa) AS idfa_md5 FROM t WHERE idfa != ''",
//!     &MySqlDialect {},
//!     CompileOptions::default(),
//! )
//! .unwrap();
//!
//! let mut row = Row::new();
//! row.insert("idfa", "abc");
//! let out = query.eval(&row).unwrap();
//! assert_eq!(out.get("idfa_md5"), Some("900150983cd24fb0d6963f7d28e17f72"));
//! ```

mod cond;
mod error;
mod eval;
mod expr;
mod functions;
pub mod pattern;
pub mod processor;
mod query;
mod row;

pub use error::{Error, Result};
pub use eval::{Predicate, ValueEvaluator};
pub use processor::{Event, Processor};
pub use query::{CompileOptions, Query};
pub use row::Row;
