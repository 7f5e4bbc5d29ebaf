//! User-visible strings.
//!
//! Every label of the editor is looked up by dotted key (`upload.applyCrop`)
//! in an embedded catalog. `{name}` placeholders are replaced from the
//! supplied parameters.

use serde_json::Value;
use std::sync::OnceLock;

const CATALOG_EN: &str = include_str!("../locales/en.json");

fn catalog() -> &'static Value {
    static CATALOG: OnceLock<Value> = OnceLock::new();
    CATALOG.get_or_init(|| {
        serde_json::from_str(CATALOG_EN).unwrap_or_else(|e| {
            log::error!("Embedded message catalog is invalid: {}", e);
            Value::Null
        })
    })
}

/// Looks up `key` without interpolation.
pub fn t(key: &str) -> String {
    t_with(key, &[])
}

/// Looks up `key` and substitutes `{param}` placeholders.
///
/// Unknown keys return the key itself; placeholders without a matching
/// parameter are left as written.
pub fn t_with(key: &str, params: &[(&str, String)]) -> String {
    let found = key
        .split('.')
        .try_fold(catalog(), |node, part| node.get(part))
        .and_then(Value::as_str);

    let Some(template) = found else {
        log::warn!("Translation key not found: {}", key);
        return key.to_string();
    };

    interpolate(template, params)
}

fn interpolate(template: &str, params: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}');
        let name = close.map(|c| &after[..c]);

        match name.filter(|n| !n.is_empty() && n.chars().all(|ch| ch.is_alphanumeric() || ch == '_')) {
            Some(name) => {
                match params.iter().find(|(k, _)| *k == name) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
