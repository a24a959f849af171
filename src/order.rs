use std::collections::HashMap;

use tracing::trace;

use crate::catalog::Catalog;
use crate::model::{OrderSummary, Product, SummaryLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn sign(self) -> i64 {
        match self {
            Direction::Increase => 1,
            Direction::Decrease => -1,
        }
    }
}

/// Normalizes a requested quantity to a non-negative multiple of the
/// product's order multiple, rounding down. Never fails: negative and NaN
/// inputs become zero, oversized inputs saturate.
pub fn set_quantity(product: &Product, requested_raw: f64) -> u32 {
    let multiple = product.order_multiple.max(1);
    let packs = (requested_raw / f64::from(multiple)).floor();
    if !(packs > 0.0) {
        return 0;
    }
    let max_packs = u32::MAX / multiple;
    let packs = if packs >= f64::from(max_packs) { max_packs } else { packs as u32 };
    packs * multiple
}

/// Moves the quantity one package up or down, then normalizes.
pub fn adjust_quantity(product: &Product, current: u32, direction: Direction) -> u32 {
    let step = i64::from(product.order_multiple) * direction.sign();
    set_quantity(product, (i64::from(current) + step) as f64)
}

/// Requested quantity per product id. Created from a catalog, so every
/// key resolves to a product in it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderState {
    quantities: HashMap<String, u32>,
}

impl OrderState {
    pub fn new(catalog: &Catalog) -> Self {
        OrderState {
            quantities: catalog.products().iter().map(|p| (p.id.clone(), 0)).collect(),
        }
    }

    pub fn quantity(&self, product_id: &str) -> u32 {
        self.quantities.get(product_id).copied().unwrap_or(0)
    }

    /// Stores the normalized quantity and returns it.
    pub fn set(&mut self, product: &Product, requested_raw: f64) -> u32 {
        let quantity = set_quantity(product, requested_raw);
        trace!(product_id = %product.id, requested_raw, quantity, "set quantity");
        self.quantities.insert(product.id.clone(), quantity);
        quantity
    }

    pub fn adjust(&mut self, product: &Product, direction: Direction) -> u32 {
        let current = self.quantity(&product.id);
        self.set(product, adjust_quantity(product, current, direction) as f64)
    }

    /// Sum of all lines, saturating at `u32::MAX`.
    pub fn total_units(&self) -> u32 {
        self.quantities.values().fold(0u32, |total, &q| total.saturating_add(q))
    }

    pub fn has_items(&self) -> bool {
        self.quantities.values().any(|&q| q > 0)
    }

    pub fn reset(&mut self) {
        self.quantities.values_mut().for_each(|q| *q = 0);
    }

    /// Lines with a positive quantity, in catalog order.
    pub fn summary(&self, catalog: &Catalog) -> OrderSummary {
        let lines: Vec<SummaryLine> = catalog
            .products()
            .iter()
            .filter_map(|product| {
                let quantity = self.quantity(&product.id);
                (quantity > 0).then(|| SummaryLine {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                    quantity,
                    unit_price: product.unit_price,
                    line_total: f64::from(quantity) * product.unit_price,
                })
            })
            .collect();

        OrderSummary {
            total_units: self.total_units(),
            total_payable: lines.iter().map(|l| l.line_total).sum(),
            lines,
        }
    }
}
