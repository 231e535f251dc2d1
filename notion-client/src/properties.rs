//! JSON encoding of property values and blocks for the Notion API.

use serde_json::{json, Map, Value};
use sync_core::{PropertyPatch, PropertyValue};
use tracing::warn;

/// Maximum characters in one rich text object.
pub const RICH_TEXT_RUN_LIMIT: usize = 2000;
/// Maximum rich text objects in one array.
pub const RICH_TEXT_RUNS_MAX: usize = 100;
/// Maximum characters in a select option name.
pub const SELECT_NAME_LIMIT: usize = 100;

/// Splits `text` into rich text objects no longer than the API allows.
pub fn rich_text_runs(text: &str) -> Vec<Value> {
    let chars: Vec<char> = text.chars().collect();
    let chunks: Vec<String> = chars
        .chunks(RICH_TEXT_RUN_LIMIT)
        .map(|chunk| chunk.iter().collect())
        .collect();

    if chunks.len() > RICH_TEXT_RUNS_MAX {
        warn!(
            "Text of {} characters exceeds Notion's rich text limit, truncating",
            chars.len()
        );
    }

    chunks
        .into_iter()
        .take(RICH_TEXT_RUNS_MAX)
        .map(|content| json!({"type": "text", "text": {"content": content}}))
        .collect()
}

/// Notion rejects commas in select options and caps their length.
pub fn select_option_name(name: &str) -> String {
    name.replace(',', " ")
        .trim()
        .chars()
        .take(SELECT_NAME_LIMIT)
        .collect()
}

pub fn property_json(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Title(text) => json!({"title": rich_text_runs(text)}),
        PropertyValue::RichText(text) => json!({"rich_text": rich_text_runs(text)}),
        PropertyValue::Number(number) => json!({"number": number}),
        PropertyValue::Checkbox(checked) => json!({"checkbox": checked}),
        PropertyValue::Url(url) => json!({"url": url}),
        PropertyValue::ExternalFile(url) => json!({
            "files": [{
                "name": url.chars().take(SELECT_NAME_LIMIT).collect::<String>(),
                "type": "external",
                "external": {"url": url}
            }]
        }),
        PropertyValue::Select { name, color } => {
            let mut option = Map::new();
            option.insert("name".to_string(), json!(select_option_name(name)));
            if let Some(color) = color {
                option.insert("color".to_string(), json!(color));
            }
            json!({"type": "select", "select": option})
        }
    }
}

pub fn properties_json(properties: &[PropertyPatch]) -> Value {
    let map: Map<String, Value> = properties
        .iter()
        .map(|patch| (patch.name.clone(), property_json(&patch.value)))
        .collect();
    Value::Object(map)
}

pub fn paragraph_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {"text": rich_text_runs(text)}
    })
}
