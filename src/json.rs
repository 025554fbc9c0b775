//! JSON5 input and JSON output.

use crate::error::{Error, Result};
use crate::value::Value;
use indexmap::IndexMap;
use serde::ser::Serializer as _;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::borrow::Cow;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::ops::Range;
use std::path::Path;

/// Options for [`NumAttrMap::save_json`](crate::NumAttrMap::save_json).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JsonOptions {
    /// Number of spaces per indentation level, or `None` for compact output
    /// on a single line.
    pub indent: Option<usize>,
    /// Remove every singleton axis of every array before converting it to
    /// nested lists.
    pub squeeze_all: bool,
}

/// Parses the JSON5 document at `path`, whose top-level value must be an
/// object.
pub(crate) fn read(path: &Path) -> Result<IndexMap<String, Value>> {
    let text = fs::read_to_string(path).map_err(Error::io(path))?;
    let value = parse(&text).map_err(|source| Error::ParseJson {
        path: path.to_owned(),
        source,
    })?;
    match value {
        Value::Map(entries) => {
            log::debug!("read {} entries from {}", entries.len(), path.display());
            Ok(entries)
        }
        other => Err(Error::NotAnObject {
            path: path.to_owned(),
            kind: other.kind(),
        }),
    }
}

/// Parses a JSON5 document.
///
/// The parser rejects integer literals outside `i64` as well as negative or
/// wide hexadecimal ones, reporting where the literal starts. Each rejected
/// literal is rewritten in place, as an integer if it fits `i64` and as a
/// float otherwise, and parsing restarts.
fn parse(text: &str) -> std::result::Result<Value, json5::Error> {
    let mut text = Cow::Borrowed(text);
    loop {
        let err = match json5::from_str(&text) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let json5::Error::Message { msg, location } = &err;
        let rewrite = match location {
            Some(at) if msg.starts_with("error parsing") => {
                rewrite_integer(&text, at.line, at.column)
            }
            _ => None,
        };
        match rewrite {
            Some((range, literal)) => {
                log::trace!("reading integer literal {} as {}", &text[range.clone()], literal);
                text.to_mut().replace_range(range, &literal);
            }
            None => return Err(err),
        }
    }
}

/// Finds the integer literal starting at the one-based `line` and `column`
/// and returns its byte range with a replacement the parser accepts.
fn rewrite_integer(text: &str, line: usize, column: usize) -> Option<(Range<usize>, String)> {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.checked_sub(1)?)
        .map(str::len)
        .sum();
    let start = line_start + text[line_start..].char_indices().nth(column.checked_sub(1)?)?.0;
    let literal = &text[start..];
    let (negative, sign_len) = match literal.as_bytes().first()? {
        b'-' => (true, 1),
        b'+' => (false, 1),
        _ => (false, 0),
    };
    let body = &literal[sign_len..];
    let (replacement, len) = if body.starts_with("0x") || body.starts_with("0X") {
        let digits = body[2..].bytes().take_while(u8::is_ascii_hexdigit).count();
        let magnitude = i128::from_str_radix(&body[2..2 + digits], 16).ok()?;
        let value = if negative { -magnitude } else { magnitude };
        let replacement = match i64::try_from(value) {
            Ok(int) => int.to_string(),
            Err(_) => format!("{:?}", value as f64),
        };
        (replacement, 2 + digits)
    } else {
        let digits = body.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 || matches!(body.as_bytes().get(digits), Some(b'.' | b'e' | b'E')) {
            return None;
        }
        let float: f64 = literal[..sign_len + digits].parse().ok()?;
        if !float.is_finite() {
            return None;
        }
        (format!("{:?}", float), digits)
    };
    Some((start..start + sign_len + len, replacement))
}

/// Writes `entries` as a JSON object to `path`.
pub(crate) fn write(
    path: &Path,
    entries: &IndexMap<String, Value>,
    indent: Option<usize>,
) -> Result<()> {
    let file = File::create(path).map_err(Error::io(path))?;
    let mut writer = BufWriter::new(file);
    let written = match indent {
        Some(width) => {
            let indent = vec![b' '; width];
            let mut ser =
                Serializer::with_formatter(&mut writer, PrettyFormatter::with_indent(&indent));
            ser.collect_map(entries)
        }
        None => Serializer::new(&mut writer).collect_map(entries),
    };
    written.map_err(|source| Error::WriteJson {
        path: path.to_owned(),
        source,
    })?;
    writer.flush().map_err(Error::io(path))?;
    log::debug!("wrote {} entries to {}", entries.len(), path.display());
    Ok(())
}
