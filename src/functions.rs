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

//! The scalar function library (spec §4.1): a closed catalogue of pure
//! `string(s) -> string` functions, registered under their canonical
//! lowercase name in a process-wide, immutable [`HANDLERS`] table built
//! once on first use.
//!
//! A table built once behind a [`OnceLock`] replaces the mutable global
//! map the original implementation used (`scalarHandlerMap`, populated by
//! an `Init`-time side effect); this is option (a) from the crate's design
//! notes: an immutable table built once at program start, never mutated
//! again.

use std::sync::{Arc, OnceLock};

use aes::Aes256;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use cfb_mode::cipher::generic_array::GenericArray;
use cfb_mode::cipher::{KeyIvInit, StreamCipher};
use cfb_mode::Encryptor as CfbEncryptor;
use md5::{Digest, Md5};
use rand::RngCore;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};
use sqlparser::ast::{Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments};

use crate::error::{Error, Result};
use crate::eval::ValueEvaluator;
use crate::expr::compile_value;
use crate::pattern;
use crate::query::CompileOptions;
use crate::row::Row;

type HandlerFn = fn(&[Expr], CompileOptions) -> Result<ValueEvaluator>;

static HANDLERS: OnceLock<std::collections::HashMap<&'static str, HandlerFn>> = OnceLock::new();

fn handlers() -> &'static std::collections::HashMap<&'static str, HandlerFn> {
    HANDLERS.get_or_init(|| {
        let mut m: std::collections::HashMap<&'static str, HandlerFn> =
            std::collections::HashMap::new();
        m.insert("md5", handle_md5);
        m.insert("sha1", handle_sha1);
        m.insert("sha2", handle_sha2);
        m.insert("to_base64", handle_to_base64);
        m.insert("aes_encrypt", handle_aes_encrypt);
        m.insert("lower", handle_lower);
        m.insert("upper", handle_upper);
        m.insert("ltrim", handle_ltrim);
        m.insert("rtrim", handle_rtrim);
        m.insert("trim", handle_trim);
        m.insert("length", handle_length);
        m.insert("concat", handle_concat);
        m.insert("concat_ws", handle_concat_ws);
        m.insert("coalesce", handle_coalesce);
        m.insert("substr", handle_substr);
        m.insert("substring", handle_substr);
        m.insert("substringindex", handle_substring_index);
        m.insert("substring_index", handle_substring_index);
        m.insert("locate", handle_locate);
        m.insert("left", handle_left);
        m.insert("right", handle_right);
        m.insert("replace", handle_replace);
        m.insert("regexp_like", handle_regexp_like);
        m.insert("regexp_instr", handle_regexp_instr);
        m.insert("regexp_substr", handle_regexp_substr);
        m.insert("regexp_replace", handle_regexp_replace);
        m
    })
}

/// Compiles a function call `Expr::Function` by looking up its lowercased
/// name in the handler table and delegating argument compilation to it.
pub fn compile_call(func: &Function, opts: CompileOptions) -> Result<ValueEvaluator> {
    let name = func
        .name
        .0
        .last()
        .map(|ident| ident.value.to_ascii_lowercase())
        .unwrap_or_default();
    let handler = handlers()
        .get(name.as_str())
        .ok_or_else(|| Error::UnknownFunction(name.clone()))?;
    let args = extract_args(func)?;
    handler(&args, opts)
}

fn extract_args(func: &Function) -> Result<Vec<Expr>> {
    let list = match &func.args {
        FunctionArguments::List(list) => list,
        FunctionArguments::None => return Ok(Vec::new()),
        FunctionArguments::Subquery(_) => {
            return Err(Error::UnsupportedExpression(
                "function call with subquery arguments".into(),
            ))
        }
    };
    list.args
        .iter()
        .map(|arg| match arg {
            FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Ok(e.clone()),
            FunctionArg::Named {
                arg: FunctionArgExpr::Expr(e),
                ..
            } => Ok(e.clone()),
            _ => Err(Error::UnsupportedExpression(
                "wildcard/named-non-expr function argument".into(),
            )),
        })
        .collect()
}

/// Evaluates an integer-literal argument at compile time (e.g. `SUBSTR`'s
/// position, `SHA2`'s hash length). A literal negative integer parses as
/// `UnaryOp { op: Minus, .. }` wrapping a positive literal, so that shape
/// is unwrapped here too.
fn evaluate_int_literal(expr: &Expr, context: &'static str) -> Result<i64> {
    use sqlparser::ast::{UnaryOperator, Value};
    match expr {
        Expr::Value(Value::Number(n, _)) => n
            .parse::<i64>()
            .map_err(|_| Error::ExpectedIntegerLiteral { context }),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => evaluate_int_literal(expr, context).map(|n| -n),
        Expr::UnaryOp {
            op: UnaryOperator::Plus,
            expr,
        } => evaluate_int_literal(expr, context),
        Expr::Nested(inner) => evaluate_int_literal(inner, context),
        _ => Err(Error::ExpectedIntegerLiteral { context }),
    }
}

/// Compiles a single-argument transform. Folds to a `Static` evaluator
/// when the argument is static (spec §4.1/§8's "static fold" property),
/// otherwise returns a `Dynamic` evaluator closing over the compiled arg.
fn one_arg(
    args: &[Expr],
    function: &'static str,
    opts: CompileOptions,
    transform: impl Fn(&str) -> String + Send + Sync + 'static,
) -> Result<ValueEvaluator> {
    if args.len() != 1 {
        return Err(Error::WrongArgumentCount { function });
    }
    let arg = compile_value(&args[0], opts)?;
    Ok(match arg.dispatch_on_static() {
        Some(value) => ValueEvaluator::Static(transform(value)),
        None => {
            let transform = Arc::new(transform);
            ValueEvaluator::dynamic(move |row: &Row| transform(&arg.evaluate(row)))
        }
    })
}

fn hex_lower(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

fn handle_md5(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "md5", opts, |s| hex_lower(&Md5::digest(s.as_bytes())))
}

fn handle_sha1(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "sha1", opts, |s| hex_lower(&Sha1::digest(s.as_bytes())))
}

/// `sha2(s, n) | n ∈ {0,224,256,384,512}`; `0` and `256` both select
/// SHA-256. Any other `n` is a compile error.
fn handle_sha2(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount { function: "sha2" });
    }
    let n = evaluate_int_literal(&args[1], "sha2 length")?;
    let transform: fn(&str) -> String = match n {
        0 | 256 => |s: &str| hex_lower(&Sha256::digest(s.as_bytes())),
        224 => |s: &str| hex_lower(&Sha224::digest(s.as_bytes())),
        384 => |s: &str| hex_lower(&Sha384::digest(s.as_bytes())),
        512 => |s: &str| hex_lower(&Sha512::digest(s.as_bytes())),
        _ => return Err(Error::UnsupportedHashLength(n)),
    };
    let arg = compile_value(&args[0], opts)?;
    Ok(match arg.dispatch_on_static() {
        Some(value) => ValueEvaluator::Static(transform(value)),
        None => ValueEvaluator::dynamic(move |row: &Row| transform(&arg.evaluate(row))),
    })
}

fn handle_to_base64(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "to_base64", opts, |s| BASE64_STANDARD.encode(s.as_bytes()))
}

/// `aes_encrypt(plain, key)`: SHA-256(key) derives the 256-bit AES key,
/// a fresh random 16-byte IV is generated per call, and the result is
/// `hex(IV || CFB-ciphertext)`. The random IV means this function is
/// never static-folded, even when both arguments are literal: unlike
/// every other entry in this table it is not pure across calls by design.
fn handle_aes_encrypt(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount {
            function: "aes_encrypt",
        });
    }
    let plain = compile_value(&args[0], opts)?;
    let key = compile_value(&args[1], opts)?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        aes_encrypt_hex(&plain.evaluate(row), &key.evaluate(row))
    }))
}

fn aes_encrypt_hex(plain: &str, key: &str) -> String {
    let derived_key = Sha256::digest(key.as_bytes());
    let key_arr = GenericArray::clone_from_slice(derived_key.as_slice());
    let mut iv = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut iv);
    let iv_arr = GenericArray::clone_from_slice(&iv);
    let mut buf = plain.as_bytes().to_vec();
    let mut cipher = CfbEncryptor::<Aes256>::new(&key_arr, &iv_arr);
    cipher.apply_keystream(&mut buf);
    let mut out = Vec::with_capacity(16 + buf.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&buf);
    hex_lower(&out)
}

fn handle_lower(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "lower", opts, |s| s.to_lowercase())
}

fn handle_upper(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "upper", opts, |s| s.to_uppercase())
}

fn handle_ltrim(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "ltrim", opts, |s| {
        s.trim_start_matches(char::is_whitespace).to_string()
    })
}

fn handle_rtrim(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "rtrim", opts, |s| {
        s.trim_end_matches(char::is_whitespace).to_string()
    })
}

fn handle_trim(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "trim", opts, |s| s.trim().to_string())
}

fn handle_length(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    one_arg(args, "length", opts, |s| s.len().to_string())
}

fn handle_concat(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    let evaluators = args
        .iter()
        .map(|e| compile_value(e, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        evaluators.iter().map(|e| e.evaluate(row)).collect()
    }))
}

fn handle_concat_ws(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.is_empty() {
        return Err(Error::WrongArgumentCount {
            function: "concat_ws",
        });
    }
    let evaluators = args
        .iter()
        .map(|e| compile_value(e, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        let sep = evaluators[0].evaluate(row);
        let parts: Vec<String> = evaluators[1..].iter().map(|e| e.evaluate(row)).collect();
        parts.join(&sep)
    }))
}

fn handle_coalesce(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.is_empty() {
        return Err(Error::WrongArgumentCount {
            function: "coalesce",
        });
    }
    let evaluators = args
        .iter()
        .map(|e| compile_value(e, opts))
        .collect::<Result<Vec<_>>>()?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        for e in &evaluators {
            let value = e.evaluate(row);
            if !value.is_empty() {
                return value;
            }
        }
        String::new()
    }))
}

/// Snaps `idx` (clamped to `s.len()`) down to the nearest UTF-8 char
/// boundary. The scalar functions below compute cut points as raw byte
/// offsets (mirroring the original Go implementation's byte-slice
/// semantics), which can land inside a multi-byte character for any
/// non-ASCII value; slicing `&str` at such an offset panics, so every
/// computed offset is passed through here first.
fn floor_char_boundary(s: &str, idx: i64) -> usize {
    let mut idx = idx.clamp(0, s.len() as i64) as usize;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

pub(crate) fn mysql_substr_no_len(s: &str, pos: i64) -> String {
    let len = s.len() as i64;
    if pos == 0 || pos > len || pos < -len {
        return String::new();
    }
    let start = if pos < 0 { len + pos } else { pos - 1 };
    let start = floor_char_boundary(s, start);
    s[start..].to_string()
}

pub(crate) fn mysql_substr_with_len(s: &str, pos: i64, sub_len: i64) -> String {
    let len = s.len() as i64;
    if pos == 0 || sub_len < 1 || pos > len || pos < -len {
        return String::new();
    }
    let start = if pos < 0 { len + pos } else { pos - 1 };
    let end = (start + sub_len).min(len);
    let start = floor_char_boundary(s, start);
    let end = floor_char_boundary(s, end as i64).max(start);
    s[start..end].to_string()
}

fn handle_substr(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    match args.len() {
        2 => {
            let pos = evaluate_int_literal(&args[1], "substr position")?;
            let s = compile_value(&args[0], opts)?;
            Ok(match s.dispatch_on_static() {
                Some(value) => ValueEvaluator::Static(mysql_substr_no_len(value, pos)),
                None => ValueEvaluator::dynamic(move |row: &Row| {
                    mysql_substr_no_len(&s.evaluate(row), pos)
                }),
            })
        }
        3 => {
            let pos = evaluate_int_literal(&args[1], "substr position")?;
            let sub_len = evaluate_int_literal(&args[2], "substr length")?;
            let s = compile_value(&args[0], opts)?;
            Ok(match s.dispatch_on_static() {
                Some(value) => ValueEvaluator::Static(mysql_substr_with_len(value, pos, sub_len)),
                None => ValueEvaluator::dynamic(move |row: &Row| {
                    mysql_substr_with_len(&s.evaluate(row), pos, sub_len)
                }),
            })
        }
        _ => Err(Error::WrongArgumentCount { function: "substr" }),
    }
}

pub(crate) fn substring_index(s: &str, delim: &str, mut count: i64) -> String {
    if delim.is_empty() {
        return String::new();
    }
    let parts: Vec<&str> = s.split(delim).collect();
    if count > 0 {
        if count > parts.len() as i64 {
            count = parts.len() as i64;
        }
        parts[..count as usize].join(delim)
    } else if count < 0 {
        if -count > parts.len() as i64 {
            count = -(parts.len() as i64);
        }
        let from = (parts.len() as i64 + count) as usize;
        parts[from..].join(delim)
    } else {
        String::new()
    }
}

fn handle_substring_index(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 3 {
        return Err(Error::WrongArgumentCount {
            function: "substringindex",
        });
    }
    let count = evaluate_int_literal(&args[2], "substringindex count")?;
    let s = compile_value(&args[0], opts)?;
    let delim = compile_value(&args[1], opts)?;
    Ok(
        match (s.dispatch_on_static(), delim.dispatch_on_static()) {
            (Some(s), Some(d)) => ValueEvaluator::Static(substring_index(s, d, count)),
            _ => ValueEvaluator::dynamic(move |row: &Row| {
                substring_index(&s.evaluate(row), &delim.evaluate(row), count)
            }),
        },
    )
}

pub(crate) fn locate(substr: &str, s: &str, pos: i64) -> String {
    if pos < 1 || substr.is_empty() {
        return "0".to_string();
    }
    let start = pos - 1;
    if start > s.len() as i64 {
        return "0".to_string();
    }
    let start = floor_char_boundary(s, start);
    match s[start..].find(substr) {
        Some(idx) => (start + idx + 1).to_string(),
        None => "0".to_string(),
    }
}

fn handle_locate(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    let pos = match args.len() {
        2 => 1,
        3 => evaluate_int_literal(&args[2], "locate position")?,
        _ => return Err(Error::WrongArgumentCount { function: "locate" }),
    };
    let substr = compile_value(&args[0], opts)?;
    let s = compile_value(&args[1], opts)?;
    Ok(
        match (substr.dispatch_on_static(), s.dispatch_on_static()) {
            (Some(substr), Some(s)) => ValueEvaluator::Static(locate(substr, s, pos)),
            _ => ValueEvaluator::dynamic(move |row: &Row| {
                locate(&substr.evaluate(row), &s.evaluate(row), pos)
            }),
        },
    )
}

/// `LEFT(s, n)`/`RIGHT(s, n)`: an out-of-range `n` clamps to `s`'s length
/// rather than indexing past the end of it (spec §9's open question on the
/// original Go implementation's unchecked `n` is resolved this way — see
/// `DESIGN.md`); the clamped byte offset is additionally snapped to the
/// nearest char boundary so a multi-byte value never panics.
fn handle_left(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount { function: "left" });
    }
    let n = evaluate_int_literal(&args[1], "left length")?;
    let s = compile_value(&args[0], opts)?;
    let f = move |s: &str| -> String {
        let n = floor_char_boundary(s, n);
        s[..n].to_string()
    };
    Ok(match s.dispatch_on_static() {
        Some(value) => ValueEvaluator::Static(f(value)),
        None => ValueEvaluator::dynamic(move |row: &Row| f(&s.evaluate(row))),
    })
}

fn handle_right(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount { function: "right" });
    }
    let n = evaluate_int_literal(&args[1], "right length")?;
    let s = compile_value(&args[0], opts)?;
    let f = move |s: &str| -> String {
        let n = n.clamp(0, s.len() as i64);
        let start = floor_char_boundary(s, s.len() as i64 - n);
        s[start..].to_string()
    };
    Ok(match s.dispatch_on_static() {
        Some(value) => ValueEvaluator::Static(f(value)),
        None => ValueEvaluator::dynamic(move |row: &Row| f(&s.evaluate(row))),
    })
}

fn handle_replace(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 3 {
        return Err(Error::WrongArgumentCount { function: "replace" });
    }
    let s = compile_value(&args[0], opts)?;
    let old = compile_value(&args[1], opts)?;
    let new = compile_value(&args[2], opts)?;
    Ok(
        match (
            s.dispatch_on_static(),
            old.dispatch_on_static(),
            new.dispatch_on_static(),
        ) {
            (Some(s), Some(old), Some(new)) => ValueEvaluator::Static(s.replace(old, new)),
            _ => ValueEvaluator::dynamic(move |row: &Row| {
                s.evaluate(row).replace(&old.evaluate(row), &new.evaluate(row))
            }),
        },
    )
}

/// Shared static/dynamic pattern compilation for the `regexp_*` family,
/// mirroring the `REGEXP` condition operator's fast path (spec §4.4): a
/// literal pattern argument is compiled once here, at Init; a
/// column/expression pattern is compiled fresh on each row and degrades to
/// `on_compile_failure` rather than propagating an error.
fn compile_regex_arg(pattern_arg: &ValueEvaluator) -> Result<Option<regex::Regex>> {
    match pattern_arg.dispatch_on_static() {
        Some(p) => pattern::compile_static(p).map(Some),
        None => Ok(None),
    }
}

fn handle_regexp_like(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount {
            function: "regexp_like",
        });
    }
    let s = compile_value(&args[0], opts)?;
    let pat = compile_value(&args[1], opts)?;
    let static_re = compile_regex_arg(&pat)?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        let matched = match &static_re {
            Some(re) => re.is_match(&s.evaluate(row)),
            None => match pattern::try_compile(&pat.evaluate(row)) {
                Some(re) => re.is_match(&s.evaluate(row)),
                None => false,
            },
        };
        if matched { "1".to_string() } else { "0".to_string() }
    }))
}

fn handle_regexp_instr(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount {
            function: "regexp_instr",
        });
    }
    let s = compile_value(&args[0], opts)?;
    let pat = compile_value(&args[1], opts)?;
    let static_re = compile_regex_arg(&pat)?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        let subject = s.evaluate(row);
        let start = match &static_re {
            Some(re) => re.find(&subject).map(|m| m.start()),
            None => pattern::try_compile(&pat.evaluate(row))
                .and_then(|re| re.find(&subject).map(|m| m.start())),
        };
        match start {
            Some(start) => (start + 1).to_string(),
            None => "0".to_string(),
        }
    }))
}

fn handle_regexp_substr(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 2 {
        return Err(Error::WrongArgumentCount {
            function: "regexp_substr",
        });
    }
    let s = compile_value(&args[0], opts)?;
    let pat = compile_value(&args[1], opts)?;
    let static_re = compile_regex_arg(&pat)?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        let subject = s.evaluate(row);
        // Diverges from MySQL on purpose: returns capture group 1, not the
        // whole match (spec §9).
        let extract = |re: &regex::Regex| -> String {
            re.captures(&subject)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };
        match &static_re {
            Some(re) => extract(re),
            None => pattern::try_compile(&pat.evaluate(row))
                .map(|re| extract(&re))
                .unwrap_or_default(),
        }
    }))
}

fn handle_regexp_replace(args: &[Expr], opts: CompileOptions) -> Result<ValueEvaluator> {
    if args.len() != 3 {
        return Err(Error::WrongArgumentCount {
            function: "regexp_replace",
        });
    }
    let s = compile_value(&args[0], opts)?;
    let pat = compile_value(&args[1], opts)?;
    let repl = compile_value(&args[2], opts)?;
    let static_re = compile_regex_arg(&pat)?;
    Ok(ValueEvaluator::dynamic(move |row: &Row| {
        let subject = s.evaluate(row);
        let replacement = repl.evaluate(row);
        match &static_re {
            Some(re) => re.replace_all(&subject, replacement.as_str()).into_owned(),
            None => pattern::try_compile(&pat.evaluate(row))
                .map(|re| re.replace_all(&subject, replacement.as_str()).into_owned())
                .unwrap_or_default(),
        }
    }))
}
