// src/registry/helpers.rs
// SQL text builders for the registry table

pub const ENDPOINTS_TABLE: &str = "api_endpoints";

/// Columns written on insert, in bind order.
pub const INSERT_COLUMNS: [&str; 8] = [
    "user_id",
    "name",
    "sheet_id",
    "sheet_range",
    "endpoint_key",
    "endpoint_path",
    "created_at",
    "updated_at",
];

/// Columns read back into an `EndpointRecord`, in `row.get` order.
pub const SELECT_COLUMNS: [&str; 9] = [
    "id",
    "user_id",
    "name",
    "sheet_id",
    "sheet_range",
    "endpoint_key",
    "endpoint_path",
    "created_at",
    "updated_at",
];

/// Quote a SQL identifier by wrapping it in double quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn quote_column_list(columns: &[&str]) -> String {
    columns
        .iter()
        .map(|name| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?, ?, ?` for `count` parameters.
pub fn build_placeholders(count: usize) -> String {
    (0..count).map(|_| "?").collect::<Vec<_>>().join(", ")
}

pub fn build_insert_sql(table_name: &str, columns: &[&str]) -> String {
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table_name),
        quote_column_list(columns),
        build_placeholders(columns.len())
    )
}

pub fn build_select_sql(table_name: &str, columns: &[&str], where_clause: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {}",
        quote_column_list(columns),
        quote_identifier(table_name),
        where_clause
    )
}

pub fn build_delete_sql(table_name: &str, where_clause: &str) -> String {
    format!(
        "DELETE FROM {} WHERE {}",
        quote_identifier(table_name),
        where_clause
    )
}
