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

//! Pattern compilation shared by `REGEXP`/`LIKE` condition evaluators and
//! the `regexp_*` scalar functions.
//!
//! Two entry points, matching the static/dynamic split in the core's
//! design: [`compile_static`] is called once at compile time and should be
//! treated as a hard compile error on failure (see the crate's error
//! handling notes); [`try_compile`] is called per row and degrades to
//! `None` on failure, which callers turn into `false`/`""`.

use regex::Regex;

use crate::error::{Error, Result};

/// Converts a SQL `LIKE` pattern to a regex source string.
///
/// `%` becomes `.*`, `_` becomes `.`, and the whole pattern is anchored
/// with `^`/`$`. This is an intentional simplification: it does not honor
/// backslash-escaped `\%`/`\_` or an `ESCAPE` clause. A pattern containing
/// an unescaped `.`, `+`, etc. is not specially quoted either, matching the
/// original implementation this crate is ported from.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 2);
    out.push('^');
    out.push_str(&pattern.replace('%', ".*").replace('_', "."));
    out.push('$');
    out
}

/// Compiles `source` once at Init time. Failure here is a compile error
/// (the core's design notes flag the original implementation's choice to
/// panic instead as a bug worth fixing).
pub fn compile_static(source: &str) -> Result<Regex> {
    Regex::new(source).map_err(|e| Error::InvalidPattern {
        pattern: source.to_string(),
        reason: e.to_string(),
    })
}

/// Compiles `source` at evaluation time. Failure degrades to `None`
/// instead of propagating, per the fail-soft runtime policy.
pub fn try_compile(source: &str) -> Option<Regex> {
    Regex::new(source).ok()
}
