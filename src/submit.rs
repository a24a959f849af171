use std::fmt;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::api::{CustomerQuery, DocumentReceipt, InvoicingApi};
use crate::catalog::Catalog;
use crate::error::{OrderError, ValidationError};
use crate::model::Customer;
use crate::order::OrderState;
use crate::payload::{DocumentPayload, DocumentSettings, build_payload};
use crate::validate::can_submit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    Validating,
    ResolvingCustomer,
    Submitting,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmitStage::Validating => "validating",
            SubmitStage::ResolvingCustomer => "resolving-customer",
            SubmitStage::Submitting => "submitting",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct SubmittedOrder {
    pub customer: Customer,
    pub payload: DocumentPayload,
    pub receipt: DocumentReceipt,
}

/// Finds the service's record for a locally selected customer: an exact id
/// match first, otherwise the first record whose name contains the
/// selected name.
pub fn resolve_customer(
    api: &dyn InvoicingApi,
    customer: &Customer,
    page_size: u32,
) -> Result<Customer, OrderError> {
    let candidates = api.find_customers(&CustomerQuery::new(&customer.name, page_size))?;

    let by_id = candidates.iter().find(|c| c.id == customer.id);
    let matched = by_id.or_else(|| candidates.iter().find(|c| c.name.contains(customer.name.as_str())));

    match matched {
        Some(found) => Ok(Customer::from(found.clone())),
        None => Err(OrderError::CustomerLookup(format!(
            "no customer named '{}' in the invoicing service",
            customer.name
        ))),
    }
}

/// Runs an order through validation, customer resolution and document
/// creation against one catalog and document configuration.
pub struct OrderSubmitter<'a> {
    api: &'a dyn InvoicingApi,
    catalog: &'a Catalog,
    settings: &'a DocumentSettings,
    lookup_page_size: u32,
}

impl<'a> OrderSubmitter<'a> {
    pub fn new(
        api: &'a dyn InvoicingApi,
        catalog: &'a Catalog,
        settings: &'a DocumentSettings,
        lookup_page_size: u32,
    ) -> Self {
        OrderSubmitter {
            api,
            catalog,
            settings,
            lookup_page_size,
        }
    }

    /// Validates and resolves the customer, returning the document that
    /// would be sent. Nothing is created remotely.
    pub fn prepare(
        &self,
        order: &OrderState,
        customer: Option<&Customer>,
        today: NaiveDate,
    ) -> Result<(Customer, DocumentPayload), OrderError> {
        info!(stage = %SubmitStage::Validating, units = order.total_units());
        can_submit(order, customer)?;
        let selected = customer.ok_or(ValidationError::NoCustomerSelected)?;

        info!(stage = %SubmitStage::ResolvingCustomer, customer_id = selected.id, name = %selected.name);
        let resolved = resolve_customer(self.api, selected, self.lookup_page_size)?;

        let payload = build_payload(order, self.catalog, &resolved, self.settings, today);
        Ok((resolved, payload))
    }

    /// Submits the order. The order is reset only when the service accepts
    /// the document; on any failure it is left untouched.
    pub fn submit(
        &self,
        order: &mut OrderState,
        customer: Option<&Customer>,
        today: NaiveDate,
    ) -> Result<SubmittedOrder, OrderError> {
        let (resolved, payload) = self.prepare(order, customer, today)?;

        info!(
            stage = %SubmitStage::Submitting,
            items = payload.items.len(),
            total = payload.total(),
            draft = payload.is_draft
        );
        let receipt = match self.api.create_document(&payload) {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(error = %e, "document creation failed, order kept");
                return Err(e);
            }
        };

        order.reset();
        info!(customer_id = resolved.id, "order submitted");
        Ok(SubmittedOrder {
            customer: resolved,
            payload,
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::StubApi;
    use crate::model::CustomerRecord;
    use crate::order::tests::product;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn remote(id: u64, name: &str) -> CustomerRecord {
        CustomerRecord {
            id,
            name: name.into(),
            phone: None,
            email: None,
        }
    }

    fn filled_order(units: f64) -> (Catalog, OrderState) {
        let p = product("1001", 12, 10.0);
        let catalog = Catalog::new(vec![p.clone()]);
        let mut order = OrderState::new(&catalog);
        order.set(&p, units);
        (catalog, order)
    }

    #[test]
    fn resolve_prefers_id_match() {
        let api = StubApi::with_customers(vec![remote(1, "Cafe Noir Ltd"), remote(2, "Cafe Noir")]);
        let selected = Customer { id: 2, name: "Cafe Noir".into() };
        let resolved = resolve_customer(&api, &selected, 1000).unwrap();
        assert_eq!(resolved.id, 2);

        let queries = api.customer_queries.borrow();
        assert_eq!(queries[0].search, "Cafe Noir");
        assert_eq!(queries[0].page_size, 1000);
    }

    #[test]
    fn resolve_falls_back_to_name_containment() {
        let api = StubApi::with_customers(vec![remote(8, "Deli"), remote(9, "Cafe Noir Ltd")]);
        let selected = Customer { id: 404, name: "Cafe Noir".into() };
        let resolved = resolve_customer(&api, &selected, 1000).unwrap();
        assert_eq!(resolved, Customer { id: 9, name: "Cafe Noir Ltd".into() });
    }

    #[test]
    fn resolve_without_match_is_a_lookup_failure() {
        let api = StubApi::with_customers(vec![remote(8, "Deli")]);
        let selected = Customer { id: 1, name: "Cafe Noir".into() };
        let err = resolve_customer(&api, &selected, 1000).unwrap_err();
        assert!(matches!(err, OrderError::CustomerLookup(_)));
    }

    #[test]
    fn successful_submission_resets_order() {
        let api = StubApi::with_customers(vec![remote(5, "Cafe Noir")]);
        let (catalog, mut order) = filled_order(60.0);
        let settings = DocumentSettings::default();
        let submitter = OrderSubmitter::new(&api, &catalog, &settings, 1000);
        let customer = Customer { id: 5, name: "Cafe Noir".into() };

        let submitted = submitter.submit(&mut order, Some(&customer), today()).unwrap();

        assert_eq!(submitted.payload.total(), 600.0);
        assert_eq!(submitted.payload.customer.id, 5);
        assert!(submitted.receipt.data.is_some());
        assert_eq!(order.total_units(), 0);
        assert_eq!(api.documents.borrow().len(), 1);
    }

    #[test]
    fn failed_submission_keeps_order() {
        let api = StubApi {
            customers: vec![remote(5, "Cafe Noir")],
            submit_error: Some("HTTP 500 Internal Server Error".into()),
            ..StubApi::default()
        };
        let (catalog, mut order) = filled_order(72.0);
        let settings = DocumentSettings::default();
        let submitter = OrderSubmitter::new(&api, &catalog, &settings, 1000);
        let customer = Customer { id: 5, name: "Cafe Noir".into() };

        let err = submitter.submit(&mut order, Some(&customer), today()).unwrap_err();

        assert!(matches!(err, OrderError::Submission(_)));
        assert_eq!(order.total_units(), 72);
    }

    #[test]
    fn invalid_order_never_reaches_the_service() {
        let api = StubApi::with_customers(vec![remote(5, "Cafe Noir")]);
        let (catalog, mut order) = filled_order(48.0);
        let settings = DocumentSettings::default();
        let submitter = OrderSubmitter::new(&api, &catalog, &settings, 1000);
        let customer = Customer { id: 5, name: "Cafe Noir".into() };

        let err = submitter.submit(&mut order, Some(&customer), today()).unwrap_err();
        assert!(matches!(
            err,
            OrderError::Validation(ValidationError::BelowMinimumUnits { total: 48, .. })
        ));

        let err = submitter.submit(&mut filled_order(60.0).1, None, today()).unwrap_err();
        assert!(matches!(err, OrderError::Validation(ValidationError::NoCustomerSelected)));

        assert!(api.customer_queries.borrow().is_empty());
        assert!(api.documents.borrow().is_empty());
    }

    #[test]
    fn unresolved_customer_stops_before_document_creation() {
        let api = StubApi {
            lookup_error: Some("HTTP 401 Unauthorized".into()),
            ..StubApi::default()
        };
        let (catalog, mut order) = filled_order(60.0);
        let settings = DocumentSettings::default();
        let submitter = OrderSubmitter::new(&api, &catalog, &settings, 1000);
        let customer = Customer { id: 5, name: "Cafe Noir".into() };

        let err = submitter.submit(&mut order, Some(&customer), today()).unwrap_err();
        assert!(matches!(err, OrderError::CustomerLookup(_)));
        assert!(api.documents.borrow().is_empty());
        assert_eq!(order.total_units(), 60);
    }

    #[test]
    fn prepare_builds_payload_without_creating_document() {
        let api = StubApi::with_customers(vec![remote(5, "Cafe Noir")]);
        let (catalog, order) = filled_order(60.0);
        let settings = DocumentSettings::default();
        let submitter = OrderSubmitter::new(&api, &catalog, &settings, 1000);
        let customer = Customer { id: 5, name: "Cafe Noir".into() };

        let (resolved, payload) = submitter.prepare(&order, Some(&customer), today()).unwrap();
        assert_eq!(resolved.id, 5);
        assert_eq!(payload.date_created, "2026-10-17");
        assert!(api.documents.borrow().is_empty());
    }
}
