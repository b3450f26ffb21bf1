//! Per-instrument position state machine.
//!
//! Rules, checked in this order, at most one firing per tick:
//! 1. FLAT + BULLISH           -> open long at the configured volume
//! 2. LONG + fast histogram < 0  -> close long with the recorded reference and volume
//! 3. FLAT + BEARISH           -> open short at the configured volume
//! 4. SHORT + fast histogram > 0 -> close short with the recorded reference and volume
//!
//! A rejected order leaves the position untouched so the same rule fires again next tick.

use std::fmt;

use crate::domain::order::{OrderReference, OrderRequest, Side};
use crate::domain::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionState {
    Flat,
    Long,
    Short,
}

impl fmt::Display for PositionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionState::Flat => f.write_str("FLAT"),
            PositionState::Long => f.write_str("LONG"),
            PositionState::Short => f.write_str("SHORT"),
        }
    }
}

/// The order that opened the currently held position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenOrder {
    pub reference: OrderReference,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Position {
    #[default]
    Flat,
    Long(OpenOrder),
    Short(OpenOrder),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderIntent {
    Open {
        side: Side,
        volume: f64,
    },
    Close {
        side: Side,
        reference: OrderReference,
        volume: f64,
    },
}

impl OrderIntent {
    pub fn to_request(&self, instrument: &str) -> OrderRequest {
        match *self {
            OrderIntent::Open { side, volume } => OrderRequest {
                instrument: instrument.to_string(),
                side,
                volume,
                closing_reference: None,
            },
            OrderIntent::Close {
                side,
                reference,
                volume,
            } => OrderRequest {
                instrument: instrument.to_string(),
                side,
                volume,
                closing_reference: Some(reference),
            },
        }
    }
}

impl fmt::Display for OrderIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderIntent::Open { side, volume } => write!(f, "open {side} {volume}"),
            OrderIntent::Close {
                side,
                reference,
                volume,
            } => write!(f, "close {reference} with {side} {volume}"),
        }
    }
}

impl Position {
    pub fn state(&self) -> PositionState {
        match self {
            Position::Flat => PositionState::Flat,
            Position::Long(_) => PositionState::Long,
            Position::Short(_) => PositionState::Short,
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn open_order(&self) -> Option<&OpenOrder> {
        match self {
            Position::Flat => None,
            Position::Long(order) | Position::Short(order) => Some(order),
        }
    }

    /// Picks the single transition for this tick, if any.
    ///
    /// `fast_histogram` is the newest fast-timeframe MACD histogram; `None` when the
    /// fast history is still too short. `volume` is the configured entry volume.
    pub fn decide(
        &self,
        signal: Signal,
        fast_histogram: Option<f64>,
        volume: Option<f64>,
    ) -> Option<OrderIntent> {
        match (self, signal) {
            (Position::Flat, Signal::Bullish) => open(Side::Buy, volume),
            (Position::Long(order), _) if fast_histogram.is_some_and(|h| h < 0.0) => {
                Some(OrderIntent::Close {
                    side: Side::Sell,
                    reference: order.reference,
                    volume: order.volume,
                })
            }
            (Position::Flat, Signal::Bearish) => open(Side::Sell, volume),
            (Position::Short(order), _) if fast_histogram.is_some_and(|h| h > 0.0) => {
                Some(OrderIntent::Close {
                    side: Side::Buy,
                    reference: order.reference,
                    volume: order.volume,
                })
            }
            _ => None,
        }
    }

    /// Applies an accepted order. Intents that do not fit the current state are ignored
    /// and reported as `false`.
    pub fn apply_fill(&mut self, intent: &OrderIntent, reference: OrderReference) -> bool {
        let next = match (*self, *intent) {
            (Position::Flat, OrderIntent::Open { side, volume }) => {
                let order = OpenOrder { reference, volume };
                match side {
                    Side::Buy => Position::Long(order),
                    Side::Sell => Position::Short(order),
                }
            }
            (Position::Long(order), OrderIntent::Close { reference: r, .. })
            | (Position::Short(order), OrderIntent::Close { reference: r, .. })
                if order.reference == r =>
            {
                Position::Flat
            }
            _ => return false,
        };
        *self = next;
        true
    }
}

fn open(side: Side, volume: Option<f64>) -> Option<OrderIntent> {
    volume
        .filter(|v| *v > 0.0)
        .map(|volume| OrderIntent::Open { side, volume })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long(reference: u64, volume: f64) -> Position {
        Position::Long(OpenOrder {
            reference: OrderReference(reference),
            volume,
        })
    }

    fn short(reference: u64, volume: f64) -> Position {
        Position::Short(OpenOrder {
            reference: OrderReference(reference),
            volume,
        })
    }

    #[test]
    fn default_is_flat() {
        let pos = Position::default();
        assert!(pos.is_flat());
        assert_eq!(pos.state(), PositionState::Flat);
        assert!(pos.open_order().is_none());
    }

    #[test]
    fn flat_bullish_opens_long() {
        let intent = Position::Flat.decide(Signal::Bullish, Some(0.2), Some(0.5));
        assert_eq!(
            intent,
            Some(OrderIntent::Open {
                side: Side::Buy,
                volume: 0.5
            })
        );
    }

    #[test]
    fn flat_bearish_opens_short() {
        let intent = Position::Flat.decide(Signal::Bearish, Some(-0.2), Some(0.5));
        assert_eq!(
            intent,
            Some(OrderIntent::Open {
                side: Side::Sell,
                volume: 0.5
            })
        );
    }

    #[test]
    fn flat_neutral_holds() {
        assert_eq!(Position::Flat.decide(Signal::Neutral, Some(1.0), Some(0.5)), None);
    }

    #[test]
    fn flat_without_volume_holds() {
        assert_eq!(Position::Flat.decide(Signal::Bullish, Some(1.0), None), None);
        assert_eq!(Position::Flat.decide(Signal::Bullish, Some(1.0), Some(0.0)), None);
    }

    #[test]
    fn long_closes_on_negative_fast_histogram() {
        let intent = long(11, 0.3).decide(Signal::Neutral, Some(-0.01), Some(1.0));
        assert_eq!(
            intent,
            Some(OrderIntent::Close {
                side: Side::Sell,
                reference: OrderReference(11),
                volume: 0.3
            })
        );
    }

    #[test]
    fn long_close_ignores_signal() {
        // Even a bearish verdict only closes; it never reverses in the same tick.
        let intent = long(11, 0.3).decide(Signal::Bearish, Some(-0.5), Some(1.0));
        assert!(matches!(intent, Some(OrderIntent::Close { .. })));
    }

    #[test]
    fn long_holds_on_non_negative_fast_histogram() {
        assert_eq!(long(11, 0.3).decide(Signal::Bullish, Some(0.0), Some(1.0)), None);
        assert_eq!(long(11, 0.3).decide(Signal::Bearish, Some(0.4), Some(1.0)), None);
        assert_eq!(long(11, 0.3).decide(Signal::Neutral, None, Some(1.0)), None);
    }

    #[test]
    fn short_closes_on_positive_fast_histogram() {
        let intent = short(12, 0.7).decide(Signal::Bullish, Some(0.01), Some(1.0));
        assert_eq!(
            intent,
            Some(OrderIntent::Close {
                side: Side::Buy,
                reference: OrderReference(12),
                volume: 0.7
            })
        );
    }

    #[test]
    fn short_holds_on_non_positive_fast_histogram() {
        assert_eq!(short(12, 0.7).decide(Signal::Bearish, Some(-0.3), Some(1.0)), None);
        assert_eq!(short(12, 0.7).decide(Signal::Neutral, Some(0.0), Some(1.0)), None);
    }

    #[test]
    fn apply_open_records_reference_and_volume() {
        let mut pos = Position::Flat;
        let intent = OrderIntent::Open {
            side: Side::Sell,
            volume: 0.25,
        };
        assert!(pos.apply_fill(&intent, OrderReference(99)));
        assert_eq!(pos, short(99, 0.25));
    }

    #[test]
    fn apply_close_goes_flat() {
        let mut pos = long(5, 0.1);
        let intent = OrderIntent::Close {
            side: Side::Sell,
            reference: OrderReference(5),
            volume: 0.1,
        };
        assert!(pos.apply_fill(&intent, OrderReference(6)));
        assert!(pos.is_flat());
    }

    #[test]
    fn apply_close_with_wrong_reference_is_ignored() {
        let mut pos = long(5, 0.1);
        let intent = OrderIntent::Close {
            side: Side::Sell,
            reference: OrderReference(4),
            volume: 0.1,
        };
        assert!(!pos.apply_fill(&intent, OrderReference(6)));
        assert_eq!(pos, long(5, 0.1));
    }

    #[test]
    fn apply_open_while_open_is_ignored() {
        let mut pos = long(5, 0.1);
        let intent = OrderIntent::Open {
            side: Side::Buy,
            volume: 0.1,
        };
        assert!(!pos.apply_fill(&intent, OrderReference(6)));
        assert_eq!(pos, long(5, 0.1));
    }

    #[test]
    fn intent_to_request() {
        let close = OrderIntent::Close {
            side: Side::Buy,
            reference: OrderReference(3),
            volume: 0.4,
        };
        let request = close.to_request("GBPUSD");
        assert_eq!(request.instrument, "GBPUSD");
        assert_eq!(request.side, Side::Buy);
        assert_eq!(request.closing_reference, Some(OrderReference(3)));
        assert!((request.volume - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn intent_display() {
        let open = OrderIntent::Open {
            side: Side::Buy,
            volume: 0.1,
        };
        assert_eq!(open.to_string(), "open BUY 0.1");
    }
}
