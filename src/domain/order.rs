//! Order requests exchanged with the broker gateway.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderReference(pub u64);

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// A market order. `closing_reference` is set when the order closes an open position.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: Side,
    pub volume: f64,
    pub closing_reference: Option<OrderReference>,
}

impl OrderRequest {
    pub fn is_close(&self) -> bool {
        self.closing_reference.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderOutcome {
    Accepted { reference: OrderReference },
    Rejected { reason: String },
}
