//! Accessors for `serde_json::Value` records driven by field names from [AddressingConfig].

use serde_json::Value;

use crate::{
    config::{AddressingConfig, AddressingMode},
    error::TreeSyncError,
    node::RowId,
    strategy::Addressing,
};

/// Builds the addressing for JSON object records from configured field names.
///
/// Identities and parent references may be strings or numbers. Paths are arrays of segments, or
/// a single string split on `/`.
pub fn addressing_from_config(config: &AddressingConfig) -> Result<Addressing<Value>, TreeSyncError> {
    let addressing = match config.mode()? {
        AddressingMode::NestedChildren => {
            let field = required(&config.children_field, "children_field")?;
            Addressing::nested_children(move |record: &Value| match record.get(&field) {
                Some(Value::Array(children)) => children.clone(),
                _ => Vec::new(),
            })
        }
        AddressingMode::DataPath => {
            let field = required(&config.path_field, "path_field")?;
            Addressing::data_path(move |record: &Value| record.get(&field).and_then(path_segments))
        }
        AddressingMode::ParentId => {
            let field = required(&config.parent_id_field, "parent_id_field")?;
            Addressing::parent_id(move |record: &Value| record.get(&field).and_then(row_id))
        }
    };
    Ok(match config.id_field.clone() {
        Some(field) => {
            addressing.with_identity(move |record: &Value| record.get(&field).and_then(row_id))
        }
        None => addressing,
    })
}

fn required(field: &Option<String>, name: &str) -> Result<String, TreeSyncError> {
    field
        .clone()
        .ok_or_else(|| TreeSyncError::Config(format!("{name} is not set")))
}

/// Scalar value as a record identity. Anything else (including null) is no identity.
pub fn row_id(value: &Value) -> Option<RowId> {
    match value {
        Value::String(s) if !s.is_empty() => Some(RowId::new(s.as_str())),
        Value::Number(n) => Some(RowId::new(n.to_string())),
        Value::Bool(b) => Some(RowId::new(b.to_string())),
        _ => None,
    }
}

pub fn path_segments(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(segments) => Some(
            segments
                .iter()
                .map(|segment| match segment {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
        ),
        Value::String(s) => Some(
            s.split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}
