use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::model::Customer;
use crate::order::OrderState;

/// Fixed document options sent with every order. Read from the `[document]`
/// table of form.toml.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentSettings {
    pub title: String,
    pub note_prefix: String,
    pub currency_id: u32,
    pub lang_id: u32,
    pub document_type: u32,
    pub vat_percentage: f64,
    pub status_id: u32,
    pub vat_type: u32,
    pub due_days: u32,
    pub draft: bool,
    pub send_sms: bool,
    pub send_email: bool,
}

impl Default for DocumentSettings {
    fn default() -> Self {
        DocumentSettings {
            title: String::new(),
            note_prefix: "הזמנה מתאריך".to_string(),
            currency_id: 2, // ILS
            lang_id: 359,   // Hebrew
            document_type: 2,
            vat_percentage: 18.0,
            status_id: 1,
            vat_type: 1,
            due_days: 30,
            draft: true,
            send_sms: false,
            send_email: false,
        }
    }
}

// Field names follow the invoicing service's createDocument schema.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentPayload {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "NotesBottom")]
    pub notes_bottom: String,
    #[serde(rename = "CurrencyID")]
    pub currency_id: u32,
    #[serde(rename = "LangID")]
    pub lang_id: u32,
    #[serde(rename = "SendSMS")]
    pub send_sms: bool,
    #[serde(rename = "SendEmail")]
    pub send_email: bool,
    #[serde(rename = "DocumentType")]
    pub document_type: u32,
    #[serde(rename = "vatPercentage")]
    pub vat_percentage: f64,
    #[serde(rename = "DateCreated")]
    pub date_created: String,
    #[serde(rename = "MaxDate")]
    pub max_date: String,
    #[serde(rename = "statusID")]
    pub status_id: u32,
    #[serde(rename = "isDraft")]
    pub is_draft: bool,
    #[serde(rename = "Customer")]
    pub customer: CustomerBlock,
    pub items: Vec<DocumentItem>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerBlock {
    #[serde(rename = "ID")]
    pub id: u64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "NameInvoice")]
    pub name_invoice: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DocumentItem {
    #[serde(rename = "Quantity")]
    pub quantity: u32,
    #[serde(rename = "Price")]
    pub price: f64,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Sku")]
    pub sku: String,
    #[serde(rename = "vatType")]
    pub vat_type: u32,
}

impl DocumentPayload {
    /// Grand total before VAT, recomputed from the items.
    pub fn total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| f64::from(item.quantity) * item.price)
            .sum()
    }

    pub fn total_units(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |total, item| total.saturating_add(item.quantity))
    }
}

/// Maps the ordered lines and the resolved customer onto a document body.
pub fn build_payload(
    order: &OrderState,
    catalog: &Catalog,
    customer: &Customer,
    settings: &DocumentSettings,
    today: NaiveDate,
) -> DocumentPayload {
    let summary = order.summary(catalog);

    let items = summary
        .lines
        .into_iter()
        .map(|line| DocumentItem {
            quantity: line.quantity,
            price: line.unit_price,
            name: line.name,
            sku: line.product_id,
            vat_type: settings.vat_type,
        })
        .collect();

    let due = today
        .checked_add_days(Days::new(u64::from(settings.due_days)))
        .unwrap_or(today);

    DocumentPayload {
        title: settings.title.clone(),
        notes: order_note(&settings.note_prefix, today),
        notes_bottom: String::new(),
        currency_id: settings.currency_id,
        lang_id: settings.lang_id,
        send_sms: settings.send_sms,
        send_email: settings.send_email,
        document_type: settings.document_type,
        vat_percentage: settings.vat_percentage,
        date_created: today.format("%Y-%m-%d").to_string(),
        max_date: due.format("%Y-%m-%d").to_string(),
        status_id: settings.status_id,
        is_draft: settings.draft,
        customer: CustomerBlock {
            id: customer.id,
            name: customer.name.clone(),
            name_invoice: customer.name.clone(),
        },
        items,
    }
}

/// e.g. "הזמנה מתאריך 17.10.2026"
pub fn order_note(prefix: &str, date: NaiveDate) -> String {
    let date = date.format("%-d.%-m.%Y").to_string();
    let prefix = prefix.trim();
    if prefix.is_empty() {
        date
    } else {
        format!("{} {}", prefix, date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::tests::product;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    }

    fn customer() -> Customer {
        Customer { id: 314, name: "Cafe Noir".into() }
    }

    fn sample_order() -> (Catalog, OrderState) {
        let a = product("1001", 12, 10.0);
        let b = product("1002", 6, 22.5);
        let c = product("1003", 1, 99.0);
        let catalog = Catalog::new(vec![a.clone(), b.clone(), c]);
        let mut order = OrderState::new(&catalog);
        order.set(&a, 48.0);
        order.set(&b, 13.0);
        (catalog, order)
    }

    #[test]
    fn payload_total_matches_line_totals() {
        let (catalog, order) = sample_order();
        let payload = build_payload(&order, &catalog, &customer(), &DocumentSettings::default(), today());

        let summary = order.summary(&catalog);
        assert_eq!(payload.total(), summary.total_payable);
        assert_eq!(payload.total(), 48.0 * 10.0 + 12.0 * 22.5);
        assert_eq!(payload.total_units(), 60);
    }

    #[test]
    fn unit_count_saturates_on_huge_lines() {
        let a = product("1001", 1, 1.0);
        let b = product("1002", 1, 1.0);
        let catalog = Catalog::new(vec![a.clone(), b.clone()]);
        let mut order = OrderState::new(&catalog);
        order.set(&a, 4_000_000_000.0);
        order.set(&b, 4_000_000_000.0);

        let payload = build_payload(&order, &catalog, &customer(), &DocumentSettings::default(), today());
        assert_eq!(payload.items.len(), 2);
        assert_eq!(payload.total_units(), u32::MAX);
    }

    #[test]
    fn zero_quantity_products_are_left_out() {
        let (catalog, order) = sample_order();
        let payload = build_payload(&order, &catalog, &customer(), &DocumentSettings::default(), today());
        let skus: Vec<&str> = payload.items.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, vec!["1001", "1002"]);
    }

    #[test]
    fn serializes_to_create_document_schema() {
        let (catalog, order) = sample_order();
        let payload = build_payload(&order, &catalog, &customer(), &DocumentSettings::default(), today());
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["Notes"], json!("הזמנה מתאריך 5.3.2026"));
        assert_eq!(value["CurrencyID"], json!(2));
        assert_eq!(value["LangID"], json!(359));
        assert_eq!(value["DocumentType"], json!(2));
        assert_eq!(value["vatPercentage"], json!(18.0));
        assert_eq!(value["DateCreated"], json!("2026-03-05"));
        assert_eq!(value["MaxDate"], json!("2026-04-04"));
        assert_eq!(value["statusID"], json!(1));
        assert_eq!(value["isDraft"], json!(true));
        assert_eq!(value["SendSMS"], json!(false));
        assert_eq!(
            value["Customer"],
            json!({ "ID": 314, "Name": "Cafe Noir", "NameInvoice": "Cafe Noir" })
        );
        assert_eq!(
            value["items"][0],
            json!({ "Quantity": 48, "Price": 10.0, "Name": "Product 1001", "Sku": "1001", "vatType": 1 })
        );
    }

    #[test]
    fn draft_flag_and_vat_come_from_settings() {
        let (catalog, order) = sample_order();
        let settings = DocumentSettings {
            draft: false,
            vat_percentage: 17.0,
            due_days: 0,
            ..DocumentSettings::default()
        };
        let payload = build_payload(&order, &catalog, &customer(), &settings, today());
        assert!(!payload.is_draft);
        assert_eq!(payload.vat_percentage, 17.0);
        assert_eq!(payload.max_date, payload.date_created);
    }

    #[test]
    fn note_without_prefix_is_just_the_date() {
        assert_eq!(order_note("  ", today()), "5.3.2026");
        assert_eq!(order_note("Order of", today()), "Order of 5.3.2026");
    }
}
