use crate::backend::{CellValue, QueryResult};
use crate::connection::DriverCandidate;
use crate::dashboard::{RenderedPage, WatchOutcome};
use crate::error::DashError;
use serde_json::{Map, Value};
use std::collections::HashSet;

fn cell_to_json(value: &CellValue) -> Value {
    match value {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(i) => Value::Number((*i).into()),
        CellValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Text(s) => Value::String(s.clone()),
    }
}

/// Output key for every column. Unnamed columns become `column`, and repeated
/// names get a numeric suffix (`user_id`, `user_id_2`) so no column is lost.
pub fn column_keys(result: &QueryResult) -> Vec<String> {
    let mut used = HashSet::new();
    result
        .columns
        .iter()
        .map(|col| {
            let base = if col.name.is_empty() { "column" } else { col.name.as_str() };
            let mut key = base.to_string();
            let mut n = 1;
            while used.contains(&key) {
                n += 1;
                key = format!("{}_{}", base, n);
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

/// Rows as an array of column-name keyed objects.
pub fn rows_to_json(result: &QueryResult) -> Value {
    let keys = column_keys(result);
    let array = result
        .rows
        .iter()
        .map(|row| {
            let mut map = Map::new();
            for (i, key) in keys.iter().enumerate() {
                let value = row.get(i).unwrap_or(&CellValue::Null);
                map.insert(key.clone(), cell_to_json(value));
            }
            Value::Object(map)
        })
        .collect();
    Value::Array(array)
}

fn encode(value: &Value) -> Result<String, DashError> {
    toon_format::encode_default(value).map_err(|e| DashError::Format { message: e.to_string() })
}

/// Convert a QueryResult to a TOON-formatted string.
pub fn to_toon(result: &QueryResult) -> Result<String, DashError> {
    // toon_format can't infer columns from an empty array, so the header for a
    // zero-row result with known columns is written by hand.
    if result.rows.is_empty() && !result.columns.is_empty() {
        let col_names = column_keys(result).join(",");
        return Ok(format!("[0]{{{}}}:\n", col_names));
    }

    encode(&rows_to_json(result))
}

fn panel_json(title: &str, result: &QueryResult) -> Value {
    let mut panel = Map::new();
    panel.insert("title".to_string(), Value::String(title.to_string()));
    panel.insert("rows".to_string(), rows_to_json(result));
    Value::Object(panel)
}

/// A rendered page: its title, headline metrics (if any) and panels.
pub fn page_to_toon(page: &RenderedPage) -> Result<String, DashError> {
    let mut root = Map::new();
    root.insert("page".to_string(), Value::String(page.page.title().to_string()));

    if !page.metrics.is_empty() {
        let metrics = page
            .metrics
            .iter()
            .map(|m| (m.label.to_string(), Value::String(m.display())))
            .collect::<Map<_, _>>();
        root.insert("metrics".to_string(), Value::Object(metrics));
    }

    let panels = page
        .panels
        .iter()
        .map(|p| panel_json(p.title, &p.result))
        .collect();
    root.insert("panels".to_string(), Value::Array(panels));

    encode(&Value::Object(root))
}

pub fn watch_to_toon(outcome: &WatchOutcome) -> Result<String, DashError> {
    let panels = vec![
        panel_json("User Watch Time", &outcome.watch_time),
        panel_json("Recent Watch History", &outcome.recent_history),
        panel_json("Recommended Titles", &outcome.recommendations),
    ];
    let mut root = Map::new();
    root.insert(
        "status".to_string(),
        Value::String("watch history recorded".to_string()),
    );
    root.insert("panels".to_string(), Value::Array(panels));
    encode(&Value::Object(root))
}

/// Driver candidates in the order connection attempts try them.
///
/// Rows are written by hand with every driver name quoted: descriptions such
/// as `ODBC Driver 18 for SQL Server` mix words and numbers, which an
/// unquoted tabular row cannot be read back from.
pub fn candidates_to_toon(candidates: &[DriverCandidate]) -> Result<String, DashError> {
    let mut out = format!("[{}]{{driver,preferred}}:", candidates.len());
    for c in candidates {
        let name = serde_json::to_string(&c.name)
            .map_err(|e| DashError::Format { message: e.to_string() })?;
        out.push_str(&format!("\n  {},{}", name, c.preferred));
    }
    Ok(out)
}

/// Convert key-value pairs to TOON format.
pub fn to_toon_kv(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{}: {}", k, v))
        .collect::<Vec<_>>()
        .join("\n")
}
