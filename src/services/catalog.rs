//! Product catalog: sheet-style snapshot parsing and the served product list.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::{fallback_menu, Product, SizeOption};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog snapshot {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Either a bare array of rows or a `{"values": [...]}` range export.
#[derive(Deserialize)]
#[serde(untagged)]
enum Snapshot {
    Rows(Vec<Vec<Value>>),
    Range { values: Vec<Vec<Value>> },
}

impl Snapshot {
    fn into_rows(self) -> Vec<Vec<Value>> {
        match self {
            Snapshot::Rows(rows) | Snapshot::Range { values: rows } => rows,
        }
    }
}

fn cell_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn cell_number(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .ok()
            .or_else(|| n.as_f64().and_then(Decimal::from_f64)),
        Value::String(s) if !s.trim().is_empty() => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

fn cell_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "TRUE" || s == "true",
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

fn sizes_from_json(value: &Value) -> Option<Vec<SizeOption>> {
    let parsed = match value {
        Value::String(raw) => serde_json::from_str::<Vec<SizeOption>>(raw).ok(),
        Value::Array(_) => serde_json::from_value::<Vec<SizeOption>>(value.clone()).ok(),
        _ => None,
    };
    parsed.filter(|sizes| !sizes.is_empty())
}

/// Column positions resolved from the (lowercased) header row.
struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(header_row: &[Value]) -> Self {
        Self {
            headers: header_row
                .iter()
                .map(|h| cell_text(Some(h)).to_lowercase())
                .collect(),
        }
    }

    fn index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn get<'a>(&self, row: &'a [Value], name: &str) -> Option<&'a Value> {
        self.index(name).and_then(|i| row.get(i))
    }
}

fn parse_row(columns: &Columns, row: &[Value]) -> Option<Product> {
    let id_cell = columns.get(row, "id");
    let id = match cell_number(id_cell).and_then(|d| d.trunc().to_i64()) {
        Some(id) => id,
        None => {
            if row.iter().any(|v| cell_present(Some(v))) {
                warn!(id = %cell_text(id_cell), "skipping catalog row without a numeric id");
            }
            return None;
        }
    };

    let name = cell_text(columns.get(row, "name"));
    let category = cell_text(columns.get(row, "category"));
    let flat_price = || cell_number(columns.get(row, "price")).unwrap_or(Decimal::ZERO);

    let product = match columns.get(row, "sizes_json").filter(|v| cell_present(Some(*v))) {
        Some(sizes_cell) => match sizes_from_json(sizes_cell) {
            Some(sizes) => Product::sized(id, name, category, sizes),
            None => {
                warn!(id, "unreadable sizes_json, using flat price");
                Product::flat(id, name, category, flat_price())
            }
        },
        None => {
            let sizes: Vec<SizeOption> = [
                ("small_price", "Small"),
                ("medium_price", "Medium"),
                ("large_price", "Large"),
            ]
            .into_iter()
            .filter(|(column, _)| cell_present(columns.get(row, column)))
            .map(|(column, label)| {
                SizeOption::new(
                    label,
                    cell_number(columns.get(row, column)).unwrap_or(Decimal::ZERO),
                )
            })
            .collect();

            if sizes.is_empty() {
                Product::flat(id, name, category, flat_price())
            } else {
                Product::sized(id, name, category, sizes)
            }
        }
    };

    Some(
        product
            .with_description(cell_text(columns.get(row, "description")))
            .with_image(cell_text(columns.get(row, "image")))
            .popular(truthy(columns.get(row, "popular"))),
    )
}

/// Parses a header row followed by product rows.
pub fn parse_sheet(rows: &[Vec<Value>]) -> Vec<Product> {
    let Some((header, body)) = rows.split_first() else {
        return Vec::new();
    };
    let columns = Columns::new(header);
    body.iter().filter_map(|row| parse_row(&columns, row)).collect()
}

pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Vec<Product>, CatalogError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let snapshot: Snapshot = serde_json::from_str(&raw).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_sheet(&snapshot.into_rows()))
}

/// Where the served catalog came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Snapshot(PathBuf),
    BuiltIn,
}

#[derive(Clone)]
pub struct CatalogService {
    products: Arc<Vec<Product>>,
    source: CatalogSource,
}

impl CatalogService {
    pub fn new(products: Vec<Product>, source: CatalogSource) -> Self {
        Self {
            products: Arc::new(products),
            source,
        }
    }

    pub fn built_in() -> Self {
        Self::new(fallback_menu(), CatalogSource::BuiltIn)
    }

    /// Loads the configured snapshot, or the built-in menu when none is set.
    /// A snapshot with no usable rows also falls back to the built-in menu.
    pub fn load(snapshot_path: Option<&str>) -> Result<Self, CatalogError> {
        let Some(path) = snapshot_path.map(str::trim).filter(|p| !p.is_empty()) else {
            info!("serving built-in menu");
            return Ok(Self::built_in());
        };

        let products = load_snapshot(path)?;
        if products.is_empty() {
            warn!(path, "catalog snapshot has no products, serving built-in menu");
            return Ok(Self::built_in());
        }

        info!(path, count = products.len(), "loaded catalog snapshot");
        Ok(Self::new(products, CatalogSource::Snapshot(PathBuf::from(path))))
    }

    pub fn list(&self) -> Vec<Product> {
        self.products.as_ref().clone()
    }

    pub fn get(&self, id: i64) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }
}
