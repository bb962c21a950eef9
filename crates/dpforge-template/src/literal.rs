//! Python literal rendering for `fill_values`.
//!
//! `Display` on [`PyValue`] produces the same text Python's `repr` would for
//! the equivalent object, so filled values read back as the value itself.

use std::fmt::{self, Write};

/// A value that can be spliced into generated Python as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<PyValue>),
    Tuple(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
}

/// Largest magnitude at which every integral `f64` is still exact.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

impl PyValue {
    /// Integral numbers render as `int` literals, everything else as `float`.
    pub fn number(value: f64) -> Self {
        if value.is_finite() && value.fract() == 0.0 && value.abs() < EXACT_INTEGER_LIMIT {
            PyValue::Int(value as i64)
        } else {
            PyValue::Float(value)
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PyValue::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// `str()` of the value: text is not quoted, everything else is `repr`.
    pub fn to_plain_string(&self) -> String {
        match self {
            PyValue::Str(value) => value.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for PyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PyValue::None => f.write_str("None"),
            PyValue::Bool(true) => f.write_str("True"),
            PyValue::Bool(false) => f.write_str("False"),
            PyValue::Int(value) => write!(f, "{value}"),
            PyValue::Float(value) => f.write_str(&float_repr(*value)),
            PyValue::Str(value) => f.write_str(&str_repr(value)),
            PyValue::List(items) => {
                f.write_char('[')?;
                write_items(f, items)?;
                f.write_char(']')
            }
            PyValue::Tuple(items) => {
                f.write_char('(')?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            PyValue::Dict(entries) => {
                f.write_char('{')?;
                for (index, (key, value)) in entries.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_char('}')
            }
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[PyValue]) -> fmt::Result {
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Shortest round-trip digits, switching to exponent form outside
/// `1e-4 <= |x| < 1e16` the way Python does.
fn float_repr(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{value:e}");
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let plain = format!("{value}");
        if plain.contains('.') {
            plain
        } else {
            format!("{plain}.0")
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    }
}

fn str_repr(value: &str) -> String {
    let quote = if value.contains('\'') && !value.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(value.len() + 2);
    out.push(quote);
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ch if ch == quote => {
                out.push('\\');
                out.push(ch);
            }
            ch if ch.is_control() => {
                let code = ch as u32;
                if code < 0x100 {
                    let _ = write!(out, "\\x{code:02x}");
                } else if code < 0x10000 {
                    let _ = write!(out, "\\u{code:04x}");
                } else {
                    let _ = write!(out, "\\U{code:08x}");
                }
            }
            ch => out.push(ch),
        }
    }
    out.push(quote);
    out
}

impl From<&str> for PyValue {
    fn from(value: &str) -> Self {
        PyValue::Str(value.to_string())
    }
}

impl From<String> for PyValue {
    fn from(value: String) -> Self {
        PyValue::Str(value)
    }
}

impl From<&String> for PyValue {
    fn from(value: &String) -> Self {
        PyValue::Str(value.clone())
    }
}

impl From<bool> for PyValue {
    fn from(value: bool) -> Self {
        PyValue::Bool(value)
    }
}

impl From<i32> for PyValue {
    fn from(value: i32) -> Self {
        PyValue::Int(i64::from(value))
    }
}

impl From<i64> for PyValue {
    fn from(value: i64) -> Self {
        PyValue::Int(value)
    }
}

impl From<u32> for PyValue {
    fn from(value: u32) -> Self {
        PyValue::Int(i64::from(value))
    }
}

impl From<f64> for PyValue {
    fn from(value: f64) -> Self {
        PyValue::Float(value)
    }
}

impl<T: Into<PyValue>> From<Option<T>> for PyValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(PyValue::None)
    }
}

impl<T: Into<PyValue>> From<Vec<T>> for PyValue {
    fn from(values: Vec<T>) -> Self {
        PyValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<PyValue>> From<&[T]> for PyValue {
    fn from(values: &[T]) -> Self {
        PyValue::List(values.iter().cloned().map(Into::into).collect())
    }
}
