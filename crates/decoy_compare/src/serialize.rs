//! Deterministic, human-readable rendering of values for diagnostics.
//!
//! Total over every value, including cyclic ones: a reference that is being
//! expanded further up the current chain renders as `>CYCLIC<`, while a
//! reference that merely repeats is expanded again in full.

use decoy_core::{MatcherKind, Value};

/// Token rendered for the wildcard sentinel
pub const IGNORED_TOKEN: &str = ">IGNORED<";
/// Token rendered for a reference already being expanded
pub const CYCLIC_TOKEN: &str = ">CYCLIC<";
/// Token rendered for every function
pub const FUNCTION_TOKEN: &str = "Function";

/// Serialize a value
#[must_use]
pub fn serialize(value: &Value) -> String {
    let mut out = String::new();
    Serializer::default().write_value(value, &mut out);
    out
}

/// Serialize an argument list as a bracketed sequence
#[must_use]
pub fn serialize_args(args: &[Value]) -> String {
    let mut out = String::new();
    Serializer::default().write_sequence(args, &mut out);
    out
}

/// Format a number the way the host prints it (`1`, `1.5`, `NaN`, `-Infinity`)
///
/// Magnitudes of at least `1e21` or below `1e-6` use exponent form with an
/// explicit sign (`1e+21`, `1.5e-7`).
#[must_use]
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "Infinity" } else { "-Infinity" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.abs() >= 1e21 || n.abs() < 1e-6 {
        let text = format!("{n:e}");
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => text,
        }
    } else if n.fract() == 0.0 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

#[derive(Default)]
struct Serializer {
    expanding: Vec<usize>,
}

impl Serializer {
    fn write_value(&mut self, value: &Value, out: &mut String) {
        match value {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => out.push_str(&format_number(*n)),
            Value::BigInt(n) => {
                out.push_str(&n.to_string());
                out.push('n');
            }
            Value::Str(s) => out.push_str(&format!("{s:?}")),
            Value::Symbol(sym) => {
                out.push_str("Symbol(");
                out.push_str(sym.description().unwrap_or(""));
                out.push(')');
            }
            Value::Date(ms) => out.push_str(&format!(">Date:{ms}<")),
            Value::RegExp(src) => out.push_str(src),
            Value::Error(err) => out.push_str(&format!("{}({:?})", err.name(), err.message())),
            Value::Function(_) => out.push_str(FUNCTION_TOKEN),
            Value::Promise(_) => out.push_str("Promise"),
            Value::Ignore => out.push_str(IGNORED_TOKEN),
            Value::Matcher(m) => out.push_str(match m.kind() {
                MatcherKind::Compare(_) => ">COMPARE<",
                MatcherKind::Mapper { .. } => ">MAPPER<",
            }),
            Value::Array(arr) => {
                if self.enter(arr.addr(), out) {
                    self.write_sequence(&arr.to_vec(), out);
                    self.expanding.pop();
                }
            }
            Value::Object(obj) => {
                if self.enter(obj.addr(), out) {
                    if let Some(class) = obj.class_name() {
                        out.push_str(&class);
                    }
                    out.push('{');
                    for (i, key) in obj.own_keys().iter().enumerate() {
                        if i > 0 {
                            out.push_str(", ");
                        }
                        out.push_str(key);
                        out.push_str(": ");
                        let member = obj.get_own(key).unwrap_or_default();
                        self.write_value(&member, out);
                    }
                    out.push('}');
                    self.expanding.pop();
                }
            }
        }
    }

    fn write_sequence(&mut self, items: &[Value], out: &mut String) {
        out.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            self.write_value(item, out);
        }
        out.push(']');
    }

    /// Push `addr` onto the expansion chain, or emit the cyclic token
    fn enter(&mut self, addr: usize, out: &mut String) -> bool {
        if self.expanding.contains(&addr) {
            out.push_str(CYCLIC_TOKEN);
            return false;
        }
        self.expanding.push(addr);
        true
    }
}
