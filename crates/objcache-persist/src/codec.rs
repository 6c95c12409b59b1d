//! Text encoding of an [`AgentChecksumTable`].

use objcache_types::{AgentChecksumTable, Checksum, ObjectId};
use serde_json::{Map, Value};

use crate::error::CodecError;

/// Encode a table as a JSON object, keys in sorted order.
pub fn encode(table: &AgentChecksumTable) -> String {
    let map: Map<String, Value> = table
        .iter()
        .map(|(object, checksum)| (object.to_string(), Value::from(checksum.get())))
        .collect();
    Value::Object(map).to_string()
}

/// Encode a table in its on-disk form: [`encode`] plus a trailing newline.
pub fn encode_record(table: &AgentChecksumTable) -> String {
    let mut text = encode(table);
    text.push('\n');
    text
}

/// Decode a table, failing as a whole on the first malformed entry.
///
/// Surrounding whitespace is ignored.
pub fn decode(text: &str) -> Result<AgentChecksumTable, CodecError> {
    let value: Value =
        serde_json::from_str(text.trim()).map_err(|e| CodecError::Syntax(e.to_string()))?;

    let map = match value {
        Value::Object(map) => map,
        other => return Err(CodecError::NotAnObject(kind_name(&other))),
    };

    let mut table = AgentChecksumTable::new();
    for (key, value) in map {
        let object = ObjectId::parse(&key).map_err(|e| CodecError::InvalidObjectId {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let checksum = value
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| CodecError::InvalidChecksum {
                key: key.clone(),
                value: value.to_string(),
            })?;
        table.insert(object, Checksum::new(checksum));
    }
    Ok(table)
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
