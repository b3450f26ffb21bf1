//! Exponential Moving Average.
//!
//! k = 2/(span+1), seeded with the first observation, then EMA[i] = x[i]*k + EMA[i-1]*(1-k).
//! Every input position gets a value; there is no warmup gap. Callers carry the
//! previous EMA themselves so a series can be continued after its head is dropped.

pub fn smoothing_factor(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// One step of the recurrence.
pub fn ema_step(prev: f64, x: f64, k: f64) -> f64 {
    x * k + prev * (1.0 - k)
}
