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

//! A minimal, host-agnostic adapter gluing a compiled [`Query`] to a batch
//! of pipeline events. Not part of the query language itself — this is the
//! ambient runnable harness a plugin host would provide, kept thin and
//! generic rather than tied to any concrete event type.

use sqlparser::dialect::MySqlDialect;

use crate::error::Result;
use crate::query::{CompileOptions, Query};
use crate::row::Row;

/// A single pipeline event, as seen by [`Processor::process_batch`].
///
/// This is the Rust shape of the host's log record: `is_log` discriminates
/// event kinds the processor should ignore (non-log telemetry, control
/// messages, ...), `indices` exposes the current key/value fields, and
/// `set_indices` replaces them (`None` drops the event's fields, signaling
/// the row was filtered out by the query's `WHERE` clause).
pub trait Event {
    fn is_log(&self) -> bool;
    fn indices(&self) -> &Row;
    fn set_indices(&mut self, indices: Option<Row>);
}

/// Compiles a query once and applies it to batches of events.
pub struct Processor {
    query: Query,
}

impl Processor {
    /// Compiles `sql` against the MySQL dialect (this crate's documented
    /// surface is a MySQL-flavored `SELECT`/`WHERE` subset).
    pub fn init(sql: &str, opts: CompileOptions) -> Result<Self> {
        let query = Query::compile(sql, &MySqlDialect {}, opts)?;
        Ok(Processor { query })
    }

    /// A short human-readable description, mirroring the original plugin
    /// adapter's `Description` method.
    pub fn description(&self) -> String {
        format!("sql processor: {}", self.query.source_sql())
    }

    /// Runs the compiled query over every event in `events`, in place.
    ///
    /// Events for which [`Event::is_log`] is `false` are left untouched
    /// (logged at `debug` level and skipped, not treated as an error).
    /// Every remaining event is evaluated against the query; a row the
    /// `WHERE` clause rejects has its indices cleared via
    /// `set_indices(None)`, otherwise the projected row replaces it.
    pub fn process_batch(&self, events: &mut [impl Event]) {
        for event in events.iter_mut() {
            if !event.is_log() {
                log::debug!(target: "rowql", "skipping non-log event");
                continue;
            }
            let projected = self.query.eval(event.indices());
            event.set_indices(projected);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeEvent {
        is_log: bool,
        indices: Row,
    }

    impl Event for FakeEvent {
        fn is_log(&self) -> bool {
            self.is_log
        }
        fn indices(&self) -> &Row {
            &self.indices
        }
        fn set_indices(&mut self, indices: Option<Row>) {
            self.indices = indices.unwrap_or_default();
        }
    }

    #[test]
    fn non_log_events_are_skipped() {
        let processor = Processor::init("SELECT a FROM t", CompileOptions::default()).unwrap();
        let mut row = Row::new();
        row.insert("a", "1");
        let mut events = vec![FakeEvent {
            is_log: false,
            indices: row.clone(),
        }];
        processor.process_batch(&mut events);
        assert_eq!(events[0].indices.get("a"), Some("1"));
    }

    #[test]
    fn matching_rows_are_projected_and_dropped_rows_are_cleared() {
        let processor =
            Processor::init("SELECT a FROM t WHERE a = '1'", CompileOptions::default()).unwrap();
        let mut keep_row = Row::new();
        keep_row.insert("a", "1");
        let mut drop_row = Row::new();
        drop_row.insert("a", "2");
        let mut events = vec![
            FakeEvent {
                is_log: true,
                indices: keep_row,
            },
            FakeEvent {
                is_log: true,
                indices: drop_row,
            },
        ];
        processor.process_batch(&mut events);
        assert_eq!(events[0].indices.get("a"), Some("1"));
        assert!(events[1].indices.is_empty());
    }
}
