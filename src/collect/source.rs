//! Rate sources feeding the collector.
//!
//! Only a stand-in feed exists today: fixed quotes with a small random wobble
//! on one series so consecutive days differ.

use chrono::NaiveDate;
use rand::prelude::*;
use rand::rngs::StdRng;

use crate::domain::Observation;
use crate::error::AppError;

/// Anything that can produce one observation for a given day.
pub trait RateSource {
    fn fetch(&mut self, date: NaiveDate) -> Result<Observation, AppError>;
}

/// A quoted series and its baseline value (percent).
#[derive(Debug, Clone, Copy)]
struct Quote {
    label: &'static str,
    base: f64,
    wobble: bool,
}

const QUOTES: [Quote; 4] = [
    Quote { label: "BOJ (Policy)", base: 0.50, wobble: false },
    Quote { label: "MUFG (Variable)", base: 2.475, wobble: false },
    Quote { label: "Yokohama (Variable)", base: 2.675, wobble: true },
    Quote { label: "Johoku (Prime)", base: 1.675, wobble: false },
];

const WOBBLE_STEPS: [f64; 3] = [0.0, 0.01, -0.01];

/// Stand-in feed used until real bank scraping exists.
pub struct DummySource {
    rng: StdRng,
}

impl DummySource {
    /// Seeded for reproducible runs; `None` draws a seed from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Series labels this source emits, in column order.
    pub fn series() -> Vec<String> {
        QUOTES.iter().map(|q| q.label.to_string()).collect()
    }
}

impl RateSource for DummySource {
    fn fetch(&mut self, date: NaiveDate) -> Result<Observation, AppError> {
        let mut rates = Vec::with_capacity(QUOTES.len());
        for quote in QUOTES {
            let step = if quote.wobble {
                *WOBBLE_STEPS
                    .choose(&mut self.rng)
                    .ok_or_else(|| AppError::new(4, "No wobble steps configured."))?
            } else {
                0.0
            };
            rates.push((quote.label, round4(quote.base + step)));
        }
        Ok(Observation::new(date, rates))
    }
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
