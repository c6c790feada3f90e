//!
//! Deep merge of a user config on top of the embedded defaults.
//! Tables merge key by key, every other value (arrays included) is replaced.
//!

use toml::map::Map;
use toml::Value;

#[derive(thiserror::Error, Debug, PartialEq)]
#[error("Incompatible types at path \"{path}\", expected \"{expected}\" received \"{received}\".")]
pub struct MergeError {
    pub path: String,
    pub expected: &'static str,
    pub received: &'static str,
}

/// Overlay `other` on top of `value`.
pub fn merge(value: Value, other: Value) -> Result<Value, MergeError> {
    merge_inner(value, other, "$")
}

fn merge_inner(value: Value, other: Value, path: &str) -> Result<Value, MergeError> {
    match (value, other) {
        (Value::Table(mut existing), Value::Table(inner)) => {
            merge_into_table(&mut existing, inner, path)?;
            Ok(Value::Table(existing))
        }
        (existing, inner) if existing.same_type(&inner) => Ok(inner),
        (existing, inner) => Err(MergeError {
            path: path.to_owned(),
            expected: existing.type_str(),
            received: inner.type_str(),
        }),
    }
}

fn merge_into_table(
    value: &mut Map<String, Value>,
    other: Map<String, Value>,
    path: &str,
) -> Result<(), MergeError> {
    for (name, inner) in other {
        if let Some(existing) = value.remove(&name) {
            let inner_path = format!("{path}.{name}");
            value.insert(name, merge_inner(existing, inner, &inner_path)?);
        } else {
            value.insert(name, inner);
        }
    }
    Ok(())
}
