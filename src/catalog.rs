use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, warn};

use crate::error::OrderError;
use crate::model::Product;

// Header aliases, compared after trimming. The Hebrew names are what the
// supplier's spreadsheet export uses.
const NAME_COLUMNS: &[&str] = &["שם מוצר", "name"];
const CODE_COLUMNS: &[&str] = &["מק\"ט", "sku", "code"];
const MULTIPLE_COLUMNS: &[&str] = &["כפולות להזמנה", "order_multiple", "multiple"];
const PRICE_COLUMNS: &[&str] = &["מחיר", "price"];

/// Products available for ordering, in feed order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Builds a catalog, keeping the first product for any repeated id.
    pub fn new(products: Vec<Product>) -> Self {
        let mut seen = HashSet::new();
        let products = products
            .into_iter()
            .filter(|p| {
                let fresh = seen.insert(p.id.clone());
                if !fresh {
                    warn!(product_id = %p.id, "duplicate product id in catalog, keeping first");
                }
                fresh
            })
            .collect();
        Catalog { products }
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn get(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

pub fn load_catalog(path: &Path) -> Result<Catalog, OrderError> {
    let source_name = path.display().to_string();
    let file = fs::File::open(path).map_err(|e| OrderError::data_load(&source_name, e))?;
    parse_catalog(file, &source_name)
}

/// Parses a product feed. Rows missing a name, code, order multiple or price
/// (or carrying values that don't parse) are dropped.
pub fn parse_catalog<R: Read>(reader: R, source_name: &str) -> Result<Catalog, OrderError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| OrderError::data_load(source_name, e))?
        .clone();

    let name_idx = require_column(&headers, NAME_COLUMNS, source_name)?;
    let code_idx = require_column(&headers, CODE_COLUMNS, source_name)?;
    let multiple_idx = require_column(&headers, MULTIPLE_COLUMNS, source_name)?;
    let price_idx = require_column(&headers, PRICE_COLUMNS, source_name)?;

    let mut products = Vec::new();
    let mut dropped = 0usize;

    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| OrderError::data_load(source_name, e))?;

        let name = cell(&record, name_idx);
        let code = cell(&record, code_idx);
        let multiple = cell(&record, multiple_idx).and_then(parse_order_multiple);
        let price = cell(&record, price_idx).and_then(parse_price);

        match (name, code, multiple, price) {
            (Some(name), Some(code), Some(order_multiple), Some(unit_price)) => {
                products.push(Product {
                    id: code.to_string(),
                    name: name.to_string(),
                    order_multiple,
                    unit_price,
                    image_path: image_path_for(name),
                });
            }
            _ => {
                // +2: header line and 1-based numbering
                debug!(line = row + 2, "dropping incomplete catalog row");
                dropped += 1;
            }
        }
    }

    if dropped > 0 {
        warn!(source = source_name, dropped, "catalog rows skipped");
    }

    Ok(Catalog::new(products))
}

/// `images/<lowercased name with spaces as dashes>.jpg`
pub fn image_path_for(name: &str) -> String {
    format!("images/{}.jpg", name.to_lowercase().replace(' ', "-"))
}

pub(crate) fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader)
}

pub(crate) fn column_index(headers: &StringRecord, aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim_start_matches('\u{feff}').trim();
        aliases.iter().any(|alias| h.eq_ignore_ascii_case(alias))
    })
}

pub(crate) fn require_column(
    headers: &StringRecord,
    aliases: &[&str],
    source_name: &str,
) -> Result<usize, OrderError> {
    column_index(headers, aliases).ok_or_else(|| {
        OrderError::data_load(source_name, format!("missing column '{}'", aliases[0]))
    })
}

pub(crate) fn cell(record: &StringRecord, idx: usize) -> Option<&str> {
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_order_multiple(raw: &str) -> Option<u32> {
    if let Ok(n) = raw.parse::<u32>() {
        return (n > 0).then_some(n);
    }
    // Spreadsheet exports sometimes write integers as "12.0"
    let value: f64 = raw.parse().ok()?;
    if value.is_finite() && value >= 1.0 && value.fract() == 0.0 && value <= f64::from(u32::MAX) {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_price(raw: &str) -> Option<f64> {
    let value: f64 = raw.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}
