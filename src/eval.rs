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
use std::sync::Arc;

use crate::row::Row;

/// A compiled value expression: either a constant known at compile time, or
/// a closure over the row computed at evaluation time.
///
/// `Dynamic` closures are `Arc<dyn Fn(&Row) -> String + Send + Sync>` (not
/// `Box`) so a compiled [`crate::Query`] can be shared across threads
/// without cloning evaluators or taking locks.
#[derive(Clone)]
pub enum ValueEvaluator {
    Static(String),
    Dynamic(Arc<dyn Fn(&Row) -> String + Send + Sync>),
}

impl ValueEvaluator {
    pub fn evaluate(&self, row: &Row) -> String {
        match self {
            ValueEvaluator::Static(value) => value.clone(),
            ValueEvaluator::Dynamic(f) => f(row),
        }
    }

    /// Returns the constant value without evaluating, if this evaluator is
    /// static. Lets callers (e.g. the `REGEXP`/`LIKE` static-pattern fast
    /// path) ask "is this a constant?" without paying for a row.
    pub fn dispatch_on_static(&self) -> Option<&str> {
        match self {
            ValueEvaluator::Static(value) => Some(value.as_str()),
            ValueEvaluator::Dynamic(_) => None,
        }
    }

    pub fn dynamic(f: impl Fn(&Row) -> String + Send + Sync + 'static) -> Self {
        ValueEvaluator::Dynamic(Arc::new(f))
    }
}

impl fmt::Debug for ValueEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueEvaluator::Static(value) => f.debug_tuple("Static").field(value).finish(),
            ValueEvaluator::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A compiled boolean expression.
#[derive(Clone)]
pub struct Predicate(Arc<dyn Fn(&Row) -> bool + Send + Sync>);

impl Predicate {
    pub fn new(f: impl Fn(&Row) -> bool + Send + Sync + 'static) -> Self {
        Predicate(Arc::new(f))
    }

    pub fn constant(value: bool) -> Self {
        Predicate::new(move |_row| value)
    }

    pub fn evaluate(&self, row: &Row) -> bool {
        (self.0)(row)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Predicate(..)")
    }
}
