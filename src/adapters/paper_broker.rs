//! Paper trading order gateway.
//!
//! Fills every well-formed market order immediately and allocates sequential
//! references. Closing orders must name a reference this broker holds open, with
//! the side opposite to the opening order.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::order::{OrderOutcome, OrderReference, OrderRequest, Side};
use crate::ports::order_port::OrderPort;

#[derive(Debug, Clone, PartialEq)]
pub struct PaperTicket {
    pub instrument: String,
    pub side: Side,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub reference: OrderReference,
    pub request: OrderRequest,
}

pub struct PaperBroker {
    next_ticket: u64,
    open: BTreeMap<OrderReference, PaperTicket>,
    journal: Vec<Fill>,
}

impl PaperBroker {
    pub fn new(first_ticket: u64) -> Self {
        Self {
            next_ticket: first_ticket,
            open: BTreeMap::new(),
            journal: Vec::new(),
        }
    }

    pub fn open_tickets(&self) -> &BTreeMap<OrderReference, PaperTicket> {
        &self.open
    }

    /// Every accepted order, in submission order.
    pub fn journal(&self) -> &[Fill] {
        &self.journal
    }

    fn check(&self, request: &OrderRequest) -> Result<(), String> {
        if request.volume.is_nan() || request.volume <= 0.0 {
            return Err(format!("invalid volume {}", request.volume));
        }

        let Some(reference) = request.closing_reference else {
            return Ok(());
        };
        let ticket = self
            .open
            .get(&reference)
            .ok_or_else(|| format!("no open position {}", reference))?;

        if ticket.instrument != request.instrument {
            return Err(format!(
                "position {} belongs to {}",
                reference, ticket.instrument
            ));
        }
        if ticket.side != request.side.opposite() {
            return Err(format!("close side {} does not offset {}", request.side, ticket.side));
        }
        if (ticket.volume - request.volume).abs() > f64::EPSILON {
            return Err(format!(
                "close volume {} differs from open volume {}",
                request.volume, ticket.volume
            ));
        }
        Ok(())
    }
}

impl Default for PaperBroker {
    fn default() -> Self {
        Self::new(1)
    }
}

impl OrderPort for PaperBroker {
    fn submit_order(&mut self, request: &OrderRequest) -> OrderOutcome {
        if let Err(reason) = self.check(request) {
            return OrderOutcome::Rejected { reason };
        }

        let reference = OrderReference(self.next_ticket);
        self.next_ticket += 1;

        match request.closing_reference {
            Some(closing) => {
                self.open.remove(&closing);
            }
            None => {
                self.open.insert(
                    reference,
                    PaperTicket {
                        instrument: request.instrument.clone(),
                        side: request.side,
                        volume: request.volume,
                    },
                );
            }
        }

        debug!(
            instrument = %request.instrument,
            side = %request.side,
            volume = request.volume,
            reference = %reference,
            "paper fill"
        );
        self.journal.push(Fill {
            reference,
            request: request.clone(),
        });
        OrderOutcome::Accepted { reference }
    }
}
