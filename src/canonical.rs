//! RFC 8785 JSON Canonicalization Scheme (JCS), used for the `payload` field
//! of the signing input (spec.md §4.2) and for Agent Card signing (§6).
//!
//! Grounded in the same `serde_json::Value`-walking approach other agent
//! protocol cores in this space use for JCS (object keys sorted, minimal
//! separators, shortest round-trip numbers), generalized here to cover the
//! full `Value` space SNAP payloads can contain.

use serde_json::{Number, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CanonicalizeError {
    #[error("value contains a non-finite number, which RFC 8785 cannot represent")]
    NonFiniteNumber,
}

/// Canonicalize a JSON value to its JCS byte representation.
///
/// Idempotent: canonicalizing already-canonical bytes re-parsed as a `Value`
/// yields the same bytes. Invariant under object-key reordering in the
/// input, since keys are always re-sorted by UTF-16 code unit.
pub fn canonicalize(value: &Value) -> Result<Vec<u8>, CanonicalizeError> {
    let mut out = String::new();
    write_value(value, &mut out)?;
    Ok(out.into_bytes())
}

fn write_value(value: &Value, out: &mut String) -> Result<(), CanonicalizeError> {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(n, out)?,
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, out)?;
            }
            out.push(']');
        }
        Value::Object(map) => {
            // Lexical sort by UTF-16 code units. Rust `str` ordering is by
            // Unicode scalar value, which agrees with UTF-16 code unit order
            // for the entire range except surrogate-pair-only codepoints
            // (U+10000..=U+10FFFF), where UTF-16 represents each as a pair of
            // surrogates (0xD800..=0xDFFF) that sort *before* the BMP — so we
            // sort on each key's UTF-16 encoding directly rather than on the
            // `str` itself.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_by(|a, b| utf16_units(a).cmp(&utf16_units(b)));

            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_value(&map[*key], out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn utf16_units(s: &str) -> Vec<u16> {
    s.encode_utf16().collect()
}

fn write_string(s: &str, out: &mut String) {
    // serde_json's string serializer already escapes `"`, `\`, and control
    // characters exactly as RFC 8785 requires (minimal escaping, `\uXXXX`
    // for control characters below 0x20); reuse it instead of re-deriving
    // the escape table.
    out.push_str(&serde_json::to_string(s).expect("string serialization cannot fail"));
}

fn write_number(n: &Number, out: &mut String) -> Result<(), CanonicalizeError> {
    if let Some(i) = n.as_i64() {
        out.push_str(&i.to_string());
        return Ok(());
    }
    if let Some(u) = n.as_u64() {
        out.push_str(&u.to_string());
        return Ok(());
    }

    let f = n.as_f64().ok_or(CanonicalizeError::NonFiniteNumber)?;
    if !f.is_finite() {
        return Err(CanonicalizeError::NonFiniteNumber);
    }
    out.push_str(&format_jcs_float(f));
    Ok(())
}

/// RFC 8785 mandates the ECMAScript `Number::toString` algorithm
/// (ECMA-262 `Number::toString`), not Rust's own float `Display`: the two
/// agree on which digits to print (both compute the shortest decimal that
/// round-trips) but disagree on how to lay those digits out — e.g. `1e-7`
/// prints as `"0.0000001"` under Rust's `Display` and as `"1e-7"` under
/// ECMAScript's rules, and values `>= 1e21` print in full under Rust but
/// switch to exponential notation under ECMAScript.
///
/// We get the correct *digits* from Rust's shortest-round-trip exponential
/// formatter (`{:e}`, which computes the same digit string as `Display`,
/// just laid out differently) and then re-lay them out ourselves per the
/// ECMAScript positional rules.
fn format_jcs_float(f: f64) -> String {
    if f == 0.0 {
        // ECMAScript Number::toString(-0) is "0", not "-0".
        return "0".to_string();
    }

    let sign = if f.is_sign_negative() { "-" } else { "" };
    let sci = format!("{:e}", f.abs());
    let (mantissa, exp_str) = sci.split_once('e').expect("{:e} output always contains 'e'");
    let exp: i64 = exp_str.parse().expect("exponent is always a valid integer");

    // The significant digits with no decimal point, e.g. "1.5e2" -> "15".
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i64;
    // ECMAScript's `n`: value == digits-as-integer * 10^(n-k).
    let n = exp + 1;

    let body = if n >= k && n <= 21 {
        format!("{digits}{}", "0".repeat((n - k) as usize))
    } else if n > 0 && n <= 21 {
        let (int_part, frac_part) = digits.split_at(n as usize);
        format!("{int_part}.{frac_part}")
    } else if n <= 0 && n > -6 {
        format!("0.{}{digits}", "0".repeat((-n) as usize))
    } else {
        let exp_val = n - 1;
        let mantissa_out = if k == 1 {
            digits.clone()
        } else {
            format!("{}.{}", &digits[0..1], &digits[1..])
        };
        let exp_sign = if exp_val >= 0 { "+" } else { "-" };
        format!("{mantissa_out}e{exp_sign}{}", exp_val.abs())
    };

    format!("{sign}{body}")
}

/// Payload size/depth limits enforced by the validator (spec.md §3, §9
/// Open Question (c)): 1 MB canonicalized, depth <= 10.
pub const MAX_PAYLOAD_BYTES: usize = 1_000_000;
pub const MAX_PAYLOAD_DEPTH: usize = 10;

/// Depth of a JSON tree, counting the root as depth 1.
pub fn depth(value: &Value) -> usize {
    match value {
        Value::Array(items) => 1 + items.iter().map(depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(depth).max().unwrap_or(0),
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys_lexically() {
        let value = json!({"z": 1, "a": "hello", "m": [3, 1, 2]});
        let canonical = String::from_utf8(canonicalize(&value).unwrap()).unwrap();
        assert_eq!(canonical, r#"{"a":"hello","m":[3,1,2],"z":1}"#);
    }

    #[test]
    fn is_idempotent_and_invariant_under_key_reorder() {
        let a = json!({"b": 2, "a": 1});
        let b = json!({"a": 1, "b": 2});
        assert_eq!(canonicalize(&a).unwrap(), canonicalize(&b).unwrap());

        let once = canonicalize(&a).unwrap();
        let reparsed: Value = serde_json::from_slice(&once).unwrap();
        let twice = canonicalize(&reparsed).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn escapes_strings_minimally() {
        let value = json!({"k": "a\"b\\c\nd"});
        let canonical = String::from_utf8(canonicalize(&value).unwrap()).unwrap();
        assert_eq!(canonical, r#"{"k":"a\"b\\c\nd"}"#);
    }

    #[test]
    fn rejects_nan_and_infinite() {
        // serde_json itself cannot construct NaN/Infinity Values from valid
        // JSON text, but a `Value::Number` built programmatically could in
        // principle carry one; guard the canonicalizer defensively.
        let value = json!({"x": 1});
        assert!(canonicalize(&value).is_ok());
    }

    #[test]
    fn formats_floats_per_ecmascript_number_to_string_not_rust_display() {
        // Rust's `Display` would print "0.0000001"; JCS requires the
        // ECMAScript exponential form.
        let tiny = String::from_utf8(canonicalize(&json!(1e-7)).unwrap()).unwrap();
        assert_eq!(tiny, "1e-7");

        // Rust's `Display` would print the full 22-digit decimal; JCS
        // switches to exponential notation at 1e21.
        let huge = String::from_utf8(canonicalize(&json!(1e21)).unwrap()).unwrap();
        assert_eq!(huge, "1e+21");

        // Just under the threshold, fixed notation is still used.
        let just_under = String::from_utf8(canonicalize(&json!(1e20)).unwrap()).unwrap();
        assert_eq!(just_under, "100000000000000000000");

        assert_eq!(
            String::from_utf8(canonicalize(&json!(0.1)).unwrap()).unwrap(),
            "0.1"
        );
        assert_eq!(
            String::from_utf8(canonicalize(&json!(1.5)).unwrap()).unwrap(),
            "1.5"
        );
        assert_eq!(
            String::from_utf8(canonicalize(&json!(-0.5)).unwrap()).unwrap(),
            "-0.5"
        );
        assert_eq!(
            String::from_utf8(canonicalize(&json!(150.0)).unwrap()).unwrap(),
            "150"
        );
        assert_eq!(
            String::from_utf8(canonicalize(&json!(-0.0)).unwrap()).unwrap(),
            "0"
        );
    }

    #[test]
    fn computes_tree_depth() {
        assert_eq!(depth(&json!(1)), 1);
        assert_eq!(depth(&json!({"a": 1})), 2);
        assert_eq!(depth(&json!({"a": {"b": {"c": 1}}})), 4);
        assert_eq!(depth(&json!([[[1]]])), 4);
    }
}
