use flixdash::backend::{CellValue, ColumnMeta, QueryResult};
use flixdash::connection::order_by_preference;
use flixdash::dashboard::{Metric, Page, Panel, RenderedPage};
use flixdash::format::{
    candidates_to_toon, column_keys, page_to_toon, rows_to_json, to_toon, to_toon_kv,
};
use std::sync::Arc;

/// Helper: encode to TOON and decode back to serde_json::Value (no type coercion)
fn round_trip(result: &QueryResult) -> serde_json::Value {
    let toon = to_toon(result).unwrap();
    toon_format::decode_no_coerce(&toon).unwrap()
}

fn col(name: &str, type_name: &str) -> ColumnMeta {
    ColumnMeta { name: name.to_string(), type_name: type_name.to_string() }
}

#[test]
fn test_2_column_2_row_result() {
    let result = QueryResult {
        columns: vec![col("country", "NVARCHAR(50)"), col("genre", "NVARCHAR(50)")],
        rows: vec![
            vec![CellValue::Text("Brazil".to_string()), CellValue::Text("Drama".to_string())],
            vec![CellValue::Text("Kenya".to_string()), CellValue::Text("Comedy".to_string())],
        ],
    };

    let decoded = round_trip(&result);
    let rows = decoded.as_array().expect("output should be a root array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["country"], "Brazil");
    assert_eq!(rows[0]["genre"], "Drama");
    assert_eq!(rows[1]["country"], "Kenya");
    assert_eq!(rows[1]["genre"], "Comedy");
}

#[test]
fn test_zero_row_result_keeps_header() {
    let result = QueryResult {
        columns: vec![col("user_id", "VARCHAR"), col("lifetime_value", "DECIMAL")],
        rows: vec![],
    };
    assert_eq!(to_toon(&result).unwrap(), "[0]{user_id,lifetime_value}:\n");
}

#[test]
fn test_rows_to_json_typed_values() {
    let result = QueryResult {
        columns: vec![
            col("name", "VARCHAR"),
            col("hours", "FLOAT"),
            col("count", "INT"),
            col("active", "BIT"),
            col("country", "VARCHAR"),
        ],
        rows: vec![vec![
            CellValue::Text("Ada".to_string()),
            CellValue::Float(12.5),
            CellValue::Int(1204),
            CellValue::Bool(true),
            CellValue::Null,
        ]],
    };

    let json = rows_to_json(&result);
    assert_eq!(
        json,
        serde_json::json!([{
            "name": "Ada",
            "hours": 12.5,
            "count": 1204,
            "active": true,
            "country": null,
        }])
    );
}

#[test]
fn test_null_cell_value() {
    let result = QueryResult {
        columns: vec![col("val", "INT")],
        rows: vec![vec![CellValue::Null]],
    };

    let decoded = round_trip(&result);
    let rows = decoded.as_array().expect("output should be a root array");
    assert_eq!(rows.len(), 1);
    assert!(rows[0]["val"].is_null(), "NULL cell should decode as null");
}

#[test]
fn test_page_output_carries_title_metrics_and_panels() {
    let page = RenderedPage {
        page: Page::Overview,
        metrics: vec![
            Metric { label: "Total Users", value: Some(1204) },
            Metric { label: "Total Titles", value: None },
        ],
        panels: vec![Panel {
            title: "Revenue Analysis",
            result: Arc::new(QueryResult {
                columns: vec![col("subscription_type", "VARCHAR")],
                rows: vec![vec![CellValue::Text("Premium".to_string())]],
            }),
        }],
    };

    let toon = page_to_toon(&page).unwrap();
    assert!(toon.contains("Platform Overview"), "Got: {}", toon);
    assert!(toon.contains("1,204"), "Got: {}", toon);
    assert!(toon.contains("n/a"), "Got: {}", toon);
    assert!(toon.contains("Revenue Analysis"), "Got: {}", toon);
    assert!(toon.contains("Premium"), "Got: {}", toon);
}

#[test]
fn test_candidates_in_preference_order() {
    let candidates = order_by_preference(
        vec![
            "ODBC Driver 17 for SQL Server".to_string(),
            "ODBC Driver 18 for SQL Server".to_string(),
        ],
        "18",
    );
    let toon = candidates_to_toon(&candidates).unwrap();
    let decoded: serde_json::Value = toon_format::decode_no_coerce(&toon).unwrap();
    let rows = decoded.as_array().expect("output should be a root array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["driver"], "ODBC Driver 18 for SQL Server");
    assert_eq!(rows[1]["driver"], "ODBC Driver 17 for SQL Server");
}

#[test]
fn test_toon_kv() {
    let kv = to_toon_kv(&[("rows", "3"), ("output", "result.toon")]);
    assert_eq!(kv, "rows: 3\noutput: result.toon");
}

#[test]
fn test_duplicate_and_unnamed_columns_are_kept() {
    let result = QueryResult {
        columns: vec![
            col("user_id", "VARCHAR"),
            col("user_id", "VARCHAR"),
            col("", "INT"),
            col("", "INT"),
        ],
        rows: vec![vec![
            CellValue::Text("u1".to_string()),
            CellValue::Text("u2".to_string()),
            CellValue::Int(3),
            CellValue::Int(4),
        ]],
    };

    assert_eq!(column_keys(&result), vec!["user_id", "user_id_2", "column", "column_2"]);
    assert_eq!(
        rows_to_json(&result),
        serde_json::json!([{ "user_id": "u1", "user_id_2": "u2", "column": 3, "column_2": 4 }])
    );
}

#[test]
fn test_zero_row_header_uses_deduplicated_names() {
    let result = QueryResult {
        columns: vec![col("id", "INT"), col("id", "INT")],
        rows: vec![],
    };
    assert_eq!(to_toon(&result).unwrap(), "[0]{id,id_2}:\n");
}
