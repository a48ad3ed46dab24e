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

//! End-to-end scenarios, one per spec §8 example.

use pretty_assertions::assert_eq;
use rowql::{CompileOptions, Query, Row};
use sqlparser::dialect::MySqlDialect;
use std::sync::{Mutex, Once, OnceLock};

/// Captures `log` records instead of printing them, so a test can assert a
/// specific warning was actually emitted rather than just its side effects.
struct CapturingLogger {
    records: Mutex<Vec<String>>,
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records.lock().unwrap().push(record.args().to_string());
    }

    fn flush(&self) {}
}

fn test_logger() -> &'static CapturingLogger {
    static LOGGER: OnceLock<CapturingLogger> = OnceLock::new();
    static INIT: Once = Once::new();
    let logger = LOGGER.get_or_init(|| CapturingLogger {
        records: Mutex::new(Vec::new()),
    });
    INIT.call_once(|| {
        log::set_logger(logger).expect("no other logger installed in this test binary");
        log::set_max_level(log::LevelFilter::Warn);
    });
    logger
}

fn compile(sql: &str) -> Query {
    Query::compile(sql, &MySqlDialect {}, CompileOptions::default()).unwrap()
}

fn row_with(pairs: &[(&str, &str)]) -> Row {
    let mut row = Row::new();
    for (k, v) in pairs {
        row.insert(*k, *v);
    }
    row
}

#[test]
fn pure_rename_and_duplicate() {
    let query = compile("SELECT a AS b, a, a AS c FROM log");
    let out = query.eval(&row_with(&[("a", "foobar")])).unwrap();
    assert_eq!(out.get("b"), Some("foobar"));
    assert_eq!(out.get("a"), Some("foobar"));
    assert_eq!(out.get("c"), Some("foobar"));
}

#[test]
fn case_md5_like_in_where() {
    let query = compile(
        r#"SELECT CONCAT_WS(".", timestamp, nanosecond) AS event_time, event_type,
                  MD5(idfa) AS idfa,
                  CASE WHEN user_agent LIKE "%iPhone OS%" THEN "ios" ELSE "android" END AS os,
                  action, LOWER(element) AS element
           FROM log WHERE event_type = "js_error""#,
    );

    let row = row_with(&[
        ("timestamp", "1234567890"),
        ("nanosecond", "123456789"),
        ("event_type", "js_error"),
        ("idfa", "abcdefg"),
        (
            "user_agent",
            "Chrome on iOS. Mozilla/5.0 (iPhone; CPU iPhone OS 16_5_1 like Mac OS X)",
        ),
        ("action", "click"),
        ("element", "#Button"),
    ]);
    let out = query.eval(&row).unwrap();
    assert_eq!(out.get("event_time"), Some("1234567890.123456789"));
    assert_eq!(out.get("event_type"), Some("js_error"));
    assert_eq!(out.get("idfa"), Some("7ac66c0f148de9519b8bd264312c4d64"));
    assert_eq!(out.get("os"), Some("ios"));
    assert_eq!(out.get("action"), Some("click"));
    assert_eq!(out.get("element"), Some("#button"));

    let perf_row = row_with(&[
        ("timestamp", "1234567890"),
        ("nanosecond", "123456789"),
        ("event_type", "perf"),
        ("idfa", "abcdefg"),
        ("user_agent", "Chrome on iOS."),
        ("action", "click"),
        ("element", "#Button"),
    ]);
    assert!(query.eval(&perf_row).is_none());
}

#[test]
fn literal_projection_and_canonical_key_naming() {
    let query = compile(r#"SELECT 123, "abc", 1.23, true, false, "a" "b" FROM log"#);
    let out = query.eval(&Row::new()).unwrap();
    assert_eq!(out.get("123"), Some("123"));
    assert_eq!(out.get("'abc'"), Some("abc"));
    assert_eq!(out.get("1.23"), Some("1.23"));
    assert_eq!(out.get("true"), Some("1"));
    assert_eq!(out.get("false"), Some("0"));
    assert_eq!(out.get("b"), Some("a"));
}

#[test]
fn nested_functions_coalesce_and_concat_ws() {
    let query =
        compile("SELECT CONCAT('a', COALESCE(col1, col2), CONCAT_WS(col3, 'c', col4)) AS ans FROM log");
    let row = row_with(&[("col1", ""), ("col2", "b"), ("col3", "d"), ("col4", "e")]);
    let out = query.eval(&row).unwrap();
    assert_eq!(out.get("ans"), Some("abcde"));
}

#[test]
fn value_form_case() {
    let query = compile("SELECT CASE a WHEN 'v1' THEN \"1\" WHEN 'v2' THEN \"2\" ELSE \"3\" END AS col1 FROM log");
    assert_eq!(
        query.eval(&row_with(&[("a", "v1")])).unwrap().get("col1"),
        Some("1")
    );
    assert_eq!(
        query.eval(&row_with(&[("a", "v")])).unwrap().get("col1"),
        Some("3")
    );
}

#[test]
fn search_form_case_with_comparisons_not_and() {
    let query = compile(
        "SELECT CASE WHEN a > 'foo' AND TRUE THEN \"1\" \
                WHEN NOT (a < 'd') THEN \"2\" \
                WHEN a != 'a' THEN \"3\" \
                ELSE \"4\" END AS col1 FROM log",
    );
    assert_eq!(
        query.eval(&row_with(&[("a", "g")])).unwrap().get("col1"),
        Some("1")
    );
    assert_eq!(
        query.eval(&row_with(&[("a", "e")])).unwrap().get("col1"),
        Some("2")
    );
    assert_eq!(
        query.eval(&row_with(&[("a", "b")])).unwrap().get("col1"),
        Some("3")
    );
    assert_eq!(
        query.eval(&row_with(&[("a", "a")])).unwrap().get("col1"),
        Some("4")
    );
}

#[test]
fn where_drop_clears_output() {
    let query = compile("SELECT a FROM log WHERE a = '1'");
    assert!(query.eval(&row_with(&[("a", "1")])).is_some());
    assert!(query.eval(&row_with(&[("a", "2")])).is_none());
}

#[test]
fn like_percent_and_underscore_wildcards() {
    let query = compile("SELECT a FROM log WHERE a LIKE '%'");
    assert!(query.eval(&row_with(&[("a", "")])).is_some());
    assert!(query.eval(&row_with(&[("a", "anything")])).is_some());

    let single_char = compile("SELECT a FROM log WHERE a LIKE '_'");
    assert!(single_char.eval(&row_with(&[("a", "x")])).is_some());
    assert!(single_char.eval(&row_with(&[("a", "xy")])).is_none());
}

#[test]
fn missing_key_renders_empty_string_with_or_without_no_key_error() {
    let quiet = Query::compile("SELECT b FROM log", &MySqlDialect {}, CompileOptions::default())
        .unwrap();
    let loud = Query::compile(
        "SELECT b FROM log",
        &MySqlDialect {},
        CompileOptions { no_key_error: true },
    )
    .unwrap();
    let row = row_with(&[("a", "x")]);
    assert_eq!(quiet.eval(&row).unwrap().get("b"), Some(""));

    let logger = test_logger();
    logger.records.lock().unwrap().clear();
    assert_eq!(loud.eval(&row).unwrap().get("b"), Some(""));
    assert!(logger
        .records
        .lock()
        .unwrap()
        .iter()
        .any(|msg| msg.contains("SQL_FIND_ALARM cannot find key:b")));
}

#[test]
fn rejects_non_select_statements() {
    let err = Query::compile(
        "INSERT INTO log VALUES (1)",
        &MySqlDialect {},
        CompileOptions::default(),
    )
    .unwrap_err();
    assert_eq!(err, rowql::Error::NotASelect);
}

#[test]
fn unknown_function_is_a_compile_error() {
    let err = Query::compile(
        "SELECT NOPE(a) FROM log",
        &MySqlDialect {},
        CompileOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, rowql::Error::UnknownFunction(ref name) if name == "nope"));
}
