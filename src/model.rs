use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub order_multiple: u32, // package size, always > 0
    pub unit_price: f64,
    pub image_path: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Customer {
    pub id: u64,
    pub name: String,
}

/// A customer directory entry. Remote records carry contact details.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CustomerRecord {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

impl CustomerRecord {
    /// `phone | email`, skipping whichever is blank.
    pub fn contact(&self) -> Option<String> {
        let parts: Vec<&str> = [self.phone.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        (!parts.is_empty()).then(|| parts.join(" | "))
    }
}

impl fmt::Display for CustomerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name.trim(), self.id)?;
        if let Some(contact) = self.contact() {
            write!(f, " · {}", contact)?;
        }
        Ok(())
    }
}

impl From<Customer> for CustomerRecord {
    fn from(customer: Customer) -> Self {
        CustomerRecord {
            id: customer.id,
            name: customer.name,
            phone: None,
            email: None,
        }
    }
}

impl From<CustomerRecord> for Customer {
    fn from(remote: CustomerRecord) -> Self {
        Customer {
            id: remote.id,
            name: remote.name.trim().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SummaryLine {
    pub product_id: String,
    pub name: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub line_total: f64,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct OrderSummary {
    pub lines: Vec<SummaryLine>,
    pub total_units: u32,
    pub total_payable: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(phone: Option<&str>, email: Option<&str>) -> CustomerRecord {
        CustomerRecord {
            id: 9,
            name: " Harbor Foods ".into(),
            phone: phone.map(Into::into),
            email: email.map(Into::into),
        }
    }

    #[test]
    fn record_shows_phone_and_email() {
        let r = record(Some("050-1234567"), Some("orders@harbor.example"));
        assert_eq!(r.to_string(), "Harbor Foods (#9) · 050-1234567 | orders@harbor.example");
    }

    #[test]
    fn record_skips_blank_contact_fields() {
        assert_eq!(record(None, Some("a@b.example")).contact().as_deref(), Some("a@b.example"));
        assert_eq!(record(Some("  "), None).contact(), None);
        assert_eq!(record(None, None).to_string(), "Harbor Foods (#9)");
    }

    #[test]
    fn local_customer_has_no_contact() {
        let r = CustomerRecord::from(Customer { id: 3, name: "Deli".into() });
        assert_eq!(r.contact(), None);
        assert_eq!(Customer::from(r), Customer { id: 3, name: "Deli".into() });
    }
}
