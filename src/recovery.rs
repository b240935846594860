use log::warn;
use serde_json::{Map, Value};

/// Pulls the JSON object out of a free-form model answer.
///
/// The candidate spans from the first `{` to the last `}`; anything around it
/// (markdown fences, prose) is ignored. No schema is checked here: consumers
/// treat missing or null keys as absent.
pub fn recover_json_object(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }

    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            warn!("Model response contained a brace block that is not valid JSON: {}", e);
            None
        }
    }
}

/// The answer with the brace span [`recover_json_object`] reads cut out, so
/// the surrounding prose can be searched without matching JSON keys.
pub fn text_outside_json_object(raw: &str) -> String {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            format!("{}\n{}", &raw[..start], &raw[end + 1..])
        }
        _ => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_inside_prose() {
        let map = recover_json_object(r#"prefix {"a":1,"b":2} suffix"#).unwrap();
        assert_eq!(Value::Object(map), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_markdown_fenced_object() {
        let raw = "Here you go:\n```json\n{\n  \"credit\": 12.5,\n  \"debit\": null\n}\n```";
        let map = recover_json_object(raw).unwrap();
        assert_eq!(map.get("credit"), Some(&json!(12.5)));
        assert_eq!(map.get("debit"), Some(&Value::Null));
    }

    #[test]
    fn test_unbalanced_braces_are_not_found() {
        assert!(recover_json_object(r#"prefix {"a":1"#).is_none());
        assert!(recover_json_object(r#"{"a": {"b": 1}"#).is_none());
        assert!(recover_json_object("} backwards {").is_none());
    }

    #[test]
    fn test_no_braces_is_not_found() {
        assert!(recover_json_object("EBT: 12.00").is_none());
        assert!(recover_json_object("").is_none());
    }

    #[test]
    fn test_text_outside_object() {
        assert_eq!(
            text_outside_json_object("Credit 5\n{\"debit\": 1}\ntrailer"),
            "Credit 5\n\n\ntrailer"
        );
        assert_eq!(text_outside_json_object("no braces"), "no braces");
    }
}
