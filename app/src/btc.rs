//! This module contains definitions for Bitcoin-specific entities and routines.

/// An integer satoshi amount. Everything in the core counts satoshis;
/// fractional BTC only appears at the bitcoind wire boundary.
#[derive(Debug, Clone, Copy, Default, PartialOrd, Ord, PartialEq, Eq)]
pub struct Sats(pub i64);

impl Sats {
    /// Converts a fractional BTC amount, as reported by bitcoind, into whole
    /// satoshis. Amounts that can't be represented (negative, NaN) collapse
    /// to zero.
    pub fn from_btc(btc: f64) -> Self {
        match bitcoin::Amount::from_btc(btc) {
            Ok(amount) => Sats(amount.to_sat() as i64),
            Err(_) => Sats(0),
        }
    }
}
