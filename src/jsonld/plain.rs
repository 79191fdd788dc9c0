use serde_json::{Map, Value};

/// Reduce a JSON-LD document to plain JSON.
///
/// `@context` is dropped, value objects collapse to their value,
/// `{"@id": x}` references collapse to `x`, `@id`/`@type` become `id`/`type`
/// and compact or absolute IRI keys are reduced to their local name. On a
/// key collision the first occurrence keeps the short name and later ones
/// keep their original key.
pub fn to_plain_json(document: &Value) -> Value {
    match document {
        Value::Array(items) => Value::Array(items.iter().map(to_plain_json).collect()),
        Value::Object(map) => plain_object(map),
        scalar => scalar.clone(),
    }
}

fn plain_object(map: &Map<String, Value>) -> Value {
    if let Some(value) = map.get("@value") {
        return to_plain_json(value);
    }
    if let Some(list) = map.get("@list").or_else(|| map.get("@set")) {
        return to_plain_json(list);
    }
    if map.len() == 1 {
        if let Some(Value::String(id)) = map.get("@id") {
            return Value::String(id.clone());
        }
    }

    let mut plain = Map::new();
    for (key, value) in map {
        let Some(short) = local_key(key) else {
            continue;
        };
        let target = if plain.contains_key(&short) {
            key.clone()
        } else {
            short
        };
        plain.insert(target, to_plain_json(value));
    }
    Value::Object(plain)
}

/// Plain name for a document key; `None` for keys that are dropped
fn local_key(key: &str) -> Option<String> {
    match key {
        "@id" => return Some("id".to_string()),
        "@type" => return Some("type".to_string()),
        k if k.starts_with('@') => return None,
        _ => {}
    }

    match key.split_once(':') {
        Some((_, rest)) if rest.starts_with("//") => {
            let local = key
                .rsplit(|c| c == '/' || c == '#')
                .find(|segment| !segment.is_empty())
                .unwrap_or(key);
            Some(local.to_string())
        }
        Some((_, local)) if !local.is_empty() => Some(local.to_string()),
        _ => Some(key.to_string()),
    }
}
