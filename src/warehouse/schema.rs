// src/warehouse/schema.rs

use google_cloud_bigquery::http::table::{TableFieldSchema, TableFieldType, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    String,
    Integer,
}

/// A destination column definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub name: &'static str,
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> Column {
    Column { name, ty }
}

/// Layout of `raw.mockaroo`. Must match the keys the transform stage writes.
pub const MARATHON_EVENTS_SCHEMA: [Column; 10] = [
    col("id", ColumnType::Integer),
    col("event_name", ColumnType::String),
    col("city", ColumnType::String),
    col("country", ColumnType::String),
    col("event_date", ColumnType::String),
    col("distance_km", ColumnType::Integer),
    col("participants", ColumnType::Integer),
    col("organizer", ColumnType::String),
    col("website", ColumnType::String),
    col("upload_timestamp", ColumnType::Integer),
];

/// Map a column type onto the BigQuery legacy type name.
pub fn map_to_bigquery_type(ty: ColumnType) -> TableFieldType {
    match ty {
        ColumnType::String => TableFieldType::String,
        ColumnType::Integer => TableFieldType::Integer,
    }
}

pub fn build_table_schema(cols: &[Column]) -> TableSchema {
    TableSchema {
        fields: cols
            .iter()
            .map(|c| TableFieldSchema {
                name: c.name.to_string(),
                data_type: map_to_bigquery_type(c.ty),
                ..Default::default()
            })
            .collect(),
    }
}
