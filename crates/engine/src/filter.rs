//! Minimal evaluator for style filter expressions, used by the simulated
//! engine when answering feature queries.
//!
//! Supports the comparison and logical forms that feature filters commonly
//! use, in both the expression (`["==", ["get", "k"], v]`) and legacy
//! (`["==", "k", v]`) spellings. Anything else evaluates to `true`.

use serde_json::{Map, Value};

use crate::feature::Feature;

pub fn matches(filter: &Value, feature: &Feature) -> bool {
    let Some(items) = filter.as_array() else {
        return match filter {
            Value::Bool(b) => *b,
            _ => true,
        };
    };
    let Some(op) = items.first().and_then(Value::as_str) else {
        return true;
    };
    let args = &items[1..];
    let props = &feature.properties;

    match op {
        "all" => args.iter().all(|f| matches(f, feature)),
        "any" => args.iter().any(|f| matches(f, feature)),
        "none" => !args.iter().any(|f| matches(f, feature)),
        "!" => args.first().is_none_or(|f| !matches(f, feature)),
        "has" => args
            .first()
            .and_then(key_of)
            .is_some_and(|k| has_key(props, feature, k)),
        "!has" => args
            .first()
            .and_then(key_of)
            .is_none_or(|k| !has_key(props, feature, k)),
        "in" | "!in" => {
            let Some(lhs) = args.first() else {
                return true;
            };
            let value = operand(lhs, props, feature);
            let candidates: &[Value] = match args.get(1) {
                // Expression form: ["in", needle, ["literal", [..]]].
                Some(Value::Array(lit)) if lit.first().and_then(Value::as_str) == Some("literal") => {
                    lit.get(1).and_then(Value::as_array).map_or(&[][..], Vec::as_slice)
                }
                _ => &args[1..],
            };
            let found = value.is_some_and(|v| candidates.contains(&v));
            if op == "in" { found } else { !found }
        }
        "==" | "!=" | "<" | ">" | "<=" | ">=" => {
            let (Some(lhs), Some(rhs)) = (args.first(), args.get(1)) else {
                return true;
            };
            let left = operand(lhs, props, feature);
            let right = literal(rhs, props, feature);
            compare(op, left.as_ref(), right.as_ref())
        }
        _ => true,
    }
}

fn key_of(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) => Some(s),
        Value::Array(items) if items.first().and_then(Value::as_str) == Some("get") => {
            items.get(1).and_then(Value::as_str)
        }
        _ => None,
    }
}

fn has_key(props: &Map<String, Value>, feature: &Feature, key: &str) -> bool {
    match key {
        "$id" => feature.id.is_some(),
        "$type" => feature.geometry.get("type").is_some(),
        _ => props.contains_key(key),
    }
}

fn special(feature: &Feature, key: &str) -> Option<Value> {
    match key {
        "$id" => feature.id.clone(),
        "$type" => feature.geometry.get("type").cloned(),
        _ => None,
    }
}

/// Left-hand side: a bare string is a property key.
fn operand(v: &Value, props: &Map<String, Value>, feature: &Feature) -> Option<Value> {
    match v {
        Value::String(key) => special(feature, key).or_else(|| props.get(key).cloned()),
        _ => literal(v, props, feature),
    }
}

/// Right-hand side: a bare string is a literal.
fn literal(v: &Value, props: &Map<String, Value>, feature: &Feature) -> Option<Value> {
    match v {
        Value::Array(items) => match items.first().and_then(Value::as_str) {
            Some("get") => items
                .get(1)
                .and_then(Value::as_str)
                .and_then(|k| props.get(k).cloned()),
            Some("id") => feature.id.clone(),
            Some("geometry-type") => feature.geometry.get("type").cloned(),
            Some("literal") => items.get(1).cloned(),
            _ => Some(v.clone()),
        },
        other => Some(other.clone()),
    }
}

fn compare(op: &str, left: Option<&Value>, right: Option<&Value>) -> bool {
    match op {
        "==" => left == right,
        "!=" => left != right,
        _ => {
            let ordering = match (left, right) {
                (Some(Value::Number(a)), Some(Value::Number(b))) => {
                    a.as_f64().zip(b.as_f64()).and_then(|(a, b)| a.partial_cmp(&b))
                }
                (Some(Value::String(a)), Some(Value::String(b))) => Some(a.cmp(b)),
                _ => None,
            };
            let Some(ordering) = ordering else {
                return false;
            };
            match op {
                "<" => ordering.is_lt(),
                ">" => ordering.is_gt(),
                "<=" => ordering.is_le(),
                ">=" => ordering.is_ge(),
                _ => false,
            }
        }
    }
}
