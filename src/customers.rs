use std::fs;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::api::{CustomerQuery, InvoicingApi};
use crate::catalog::{cell, csv_reader, require_column};
use crate::config::{CustomerSource, resolve_path};
use crate::error::OrderError;
use crate::model::{Customer, CustomerRecord};

const NAME_COLUMNS: &[&str] = &["שם לקוח", "name", "customer"];
const ID_COLUMNS: &[&str] = &["מספר לקוח", "id", "customer_id"];

/// Remote searches shorter than this return nothing without calling the API.
pub const MIN_SEARCH_CHARS: usize = 2;

/// Where the customer picker gets its choices from.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerDirectory {
    Local(Vec<Customer>),
    Remote,
}

impl CustomerDirectory {
    pub fn open(root: &Path, source: &CustomerSource) -> Result<Self, OrderError> {
        match source {
            CustomerSource::Csv { path } => {
                let customers = load_customers(&resolve_path(root, path))?;
                Ok(CustomerDirectory::Local(customers))
            }
            CustomerSource::Remote => Ok(CustomerDirectory::Remote),
        }
    }

    /// Records matching `term`, from the local list or the remote service.
    pub fn search(
        &self,
        api: &dyn InvoicingApi,
        term: &str,
        page_size: u32,
    ) -> Result<Vec<CustomerRecord>, OrderError> {
        match self {
            CustomerDirectory::Local(customers) => Ok(filter_customers(customers, term)
                .into_iter()
                .cloned()
                .map(CustomerRecord::from)
                .collect()),
            CustomerDirectory::Remote => search_remote(api, term, page_size),
        }
    }
}

pub fn load_customers(path: &Path) -> Result<Vec<Customer>, OrderError> {
    let source_name = path.display().to_string();
    let file = fs::File::open(path).map_err(|e| OrderError::data_load(&source_name, e))?;
    parse_customers(file, &source_name)
}

pub fn parse_customers<R: Read>(reader: R, source_name: &str) -> Result<Vec<Customer>, OrderError> {
    let mut rdr = csv_reader(reader);
    let headers = rdr
        .headers()
        .map_err(|e| OrderError::data_load(source_name, e))?
        .clone();

    let name_idx = require_column(&headers, NAME_COLUMNS, source_name)?;
    let id_idx = require_column(&headers, ID_COLUMNS, source_name)?;

    let mut customers = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| OrderError::data_load(source_name, e))?;
        let name = cell(&record, name_idx);
        let id = cell(&record, id_idx).and_then(parse_customer_id);

        match (name, id) {
            (Some(name), Some(id)) => customers.push(Customer {
                id,
                name: name.to_string(),
            }),
            _ => debug!(line = row + 2, "dropping incomplete customer row"),
        }
    }

    if customers.is_empty() {
        warn!(source = source_name, "customer feed has no usable rows");
    }
    Ok(customers)
}

fn parse_customer_id(raw: &str) -> Option<u64> {
    raw.parse::<u64>().ok().or_else(|| {
        let value: f64 = raw.parse().ok()?;
        (value.is_finite() && value >= 0.0 && value.fract() == 0.0).then_some(value as u64)
    })
}

/// Case-insensitive containment match on the name or the numeric id.
pub fn filter_customers<'a>(customers: &'a [Customer], term: &str) -> Vec<&'a Customer> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return customers.iter().collect();
    }
    customers
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&term) || c.id.to_string().contains(&term))
        .collect()
}

/// Searches the remote customer directory. Names come back trimmed; records
/// without a name are dropped.
pub fn search_remote(
    api: &dyn InvoicingApi,
    term: &str,
    page_size: u32,
) -> Result<Vec<CustomerRecord>, OrderError> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_CHARS {
        return Ok(Vec::new());
    }

    let found = api.find_customers(&CustomerQuery::new(term, page_size))?;
    debug!(term, results = found.len(), "remote customer search");
    Ok(found
        .into_iter()
        .map(|record| CustomerRecord {
            name: record.name.trim().to_string(),
            ..record
        })
        .filter(|record| !record.name.is_empty())
        .collect())
}
