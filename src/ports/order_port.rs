//! Order submission port trait.

use crate::domain::order::{OrderOutcome, OrderRequest};

pub trait OrderPort {
    /// Submits a market order synchronously. No retry happens behind this call.
    fn submit_order(&mut self, request: &OrderRequest) -> OrderOutcome;
}
