//! Key mapping between the camelCase rows used in the crate and the snake_case columns of the
//! hosted database. Values are never touched.

use serde_json::{Map, Value};

pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (index, ch) in name.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if index > 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' && !out.is_empty() {
            upper_next = true;
        } else if upper_next {
            out.push(ch.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

pub fn row_to_wire(row: Map<String, Value>) -> Map<String, Value> {
    map_keys(row, &camel_to_snake)
}

pub fn row_from_wire(row: Map<String, Value>) -> Map<String, Value> {
    map_keys(row, &snake_to_camel)
}

pub fn value_from_wire(value: Value) -> Value {
    map_value(value, &snake_to_camel)
}

/// Maps every identifier of a select list, nested fetches included:
/// `*, saleItems(productId, quantity)` becomes `*, sale_items(product_id, quantity)`.
pub fn select_to_wire(columns: &str) -> String {
    let mut out = String::with_capacity(columns.len() + 8);
    let mut ident = String::new();
    for ch in columns.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            ident.push(ch);
        } else {
            if !ident.is_empty() {
                out.push_str(&camel_to_snake(&ident));
                ident.clear();
            }
            out.push(ch);
        }
    }
    if !ident.is_empty() {
        out.push_str(&camel_to_snake(&ident));
    }
    out
}

fn map_keys(row: Map<String, Value>, rename: &dyn Fn(&str) -> String) -> Map<String, Value> {
    row.into_iter()
        .map(|(key, value)| (rename(&key), map_value(value, rename)))
        .collect()
}

fn map_value(value: Value, rename: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Object(map) => Value::Object(map_keys(map, rename)),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| map_value(item, rename))
                .collect(),
        ),
        other => other,
    }
}
