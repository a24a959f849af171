use crate::error::ValidationError;
use crate::model::Customer;
use crate::order::OrderState;

/// Fewest total units (across all products) an order may be submitted with.
pub const MIN_ORDER_UNITS: u32 = 60;

/// Gates the submit action. The unit minimum is checked before the customer,
/// so a short order reports `BelowMinimumUnits` whether or not a customer
/// has been picked.
pub fn can_submit(order: &OrderState, customer: Option<&Customer>) -> Result<(), ValidationError> {
    let total = order.total_units();
    if total < MIN_ORDER_UNITS {
        return Err(ValidationError::BelowMinimumUnits {
            total,
            minimum: MIN_ORDER_UNITS,
        });
    }
    if customer.is_none() {
        return Err(ValidationError::NoCustomerSelected);
    }
    Ok(())
}
