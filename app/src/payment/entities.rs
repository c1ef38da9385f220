use crate::btc;
use crate::chain::AddrStatus;
use crate::ln;

/// The artifact returned for one issued payment: an LN invoice and an
/// on-chain address bound to the same logical payment.
#[derive(Debug, Clone, Default)]
pub struct NewPayment {
    pub created_at: i64,
    /// Seconds relative to `created_at`.
    pub expiry: i64,
    pub bolt11: String,
    pub hash: String,
    pub address: String,
}

/// One merged history entry: an LN invoice plus whatever its watch-only
/// address has received.
#[derive(Debug, Clone, Default)]
pub struct Payment {
    pub details: NewPayment,
    pub description: String,
    /// The requested amount.
    pub amount: btc::Sats,
    pub expired: bool,
    pub paid: bool,
    pub paid_at: i64,
    pub ln_paid: bool,
    /// Only true once the address received at least the requested amount.
    pub btc_paid: bool,
    pub btc_amount: btc::Sats,
    pub confirmations: i64,
    pub txids: Vec<String>,
}

impl Payment {
    pub(super) fn apply_ln(&mut self, invoice: ln::Invoice) {
        self.description = invoice.description;
        self.amount = invoice.amount;
        self.expired = invoice.expired;
        self.ln_paid = invoice.paid;
        self.paid = self.paid || invoice.paid;
        self.paid_at = invoice.paid_at;
        self.details = NewPayment {
            created_at: invoice.created_at,
            expiry: invoice.expiry,
            bolt11: invoice.bolt11,
            hash: invoice.hash,
            address: String::new(),
        };
        self.check_btc_paid();
    }

    pub(super) fn apply_btc(&mut self, status: AddrStatus) {
        self.details.address = status.address;
        self.btc_amount = btc::Sats::from_btc(status.amount);
        self.confirmations = status.confirmations;
        self.txids = status.txids;
        self.check_btc_paid();
    }

    // Meaningful only once the requested amount is known.
    fn check_btc_paid(&mut self) {
        if self.amount.0 == 0 || self.btc_amount.0 == 0 {
            return;
        }
        if self.btc_amount >= self.amount {
            self.btc_paid = true;
            self.paid = true;
        }
    }
}

/// Outcome of a settlement watch. `code` is the HTTP status the API layer
/// should reply with; zero means a non-terminal update was observed.
#[derive(Debug, Clone, Default)]
pub struct StatusReply {
    pub code: u16,
    pub error: Option<String>,
    pub ln: Option<ln::Status>,
    pub bitcoin: Option<AddrStatus>,
}

impl StatusReply {
    pub fn ln(code: u16, status: ln::Status) -> Self {
        Self {
            code,
            ln: Some(status),
            ..Self::default()
        }
    }

    pub fn bitcoin(code: u16, status: AddrStatus) -> Self {
        Self {
            code,
            bitcoin: Some(status),
            ..Self::default()
        }
    }

    pub fn error(code: u16, message: String) -> Self {
        Self {
            code,
            error: Some(message),
            ..Self::default()
        }
    }

    pub fn expired() -> Self {
        Self::error(408, "expired".to_owned())
    }

    pub fn cancelled() -> Self {
        Self::error(499, "cancelled by client".to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice(amount: i64, paid: bool, expired: bool) -> ln::Invoice {
        ln::Invoice {
            bolt11: "lnbc10u1fake".to_owned(),
            hash: "ab".repeat(32),
            created_at: 1_700_000_000,
            expiry: 3600,
            description: "tea".to_owned(),
            amount: btc::Sats(amount),
            paid,
            paid_at: if paid { 1_700_000_100 } else { 0 },
            expired,
        }
    }

    fn receipt(amount: f64) -> AddrStatus {
        AddrStatus {
            address: "2NFnM1S".to_owned(),
            amount,
            confirmations: 1,
            label: "ab".repeat(32),
            txids: vec!["dead".to_owned()],
        }
    }

    #[test]
    fn ln_settlement_marks_the_payment_paid() {
        let mut payment = Payment::default();
        payment.apply_ln(invoice(1000, true, false));
        assert!(payment.paid);
        assert!(payment.ln_paid);
        assert!(!payment.btc_paid);
        assert_eq!(payment.paid_at, 1_700_000_100);
    }

    #[test]
    fn sufficient_chain_receipt_marks_btc_paid() {
        let mut payment = Payment::default();
        payment.apply_ln(invoice(1000, false, false));
        payment.apply_btc(receipt(0.00001000));
        assert!(payment.btc_paid);
        assert!(payment.paid);
        assert_eq!(payment.btc_amount, btc::Sats(1000));
        assert_eq!(payment.details.address, "2NFnM1S");
    }

    #[test]
    fn partial_chain_receipt_is_not_paid() {
        let mut payment = Payment::default();
        payment.apply_ln(invoice(1000, false, false));
        payment.apply_btc(receipt(0.00000600));
        assert!(!payment.btc_paid);
        assert!(!payment.paid);
        assert_eq!(payment.btc_amount, btc::Sats(600));
    }

    #[test]
    fn zero_requested_amount_never_counts_as_btc_paid() {
        let mut payment = Payment::default();
        payment.apply_ln(invoice(0, false, false));
        payment.apply_btc(receipt(0.00001500));
        assert!(!payment.btc_paid);
        assert!(!payment.paid);
    }

    #[test]
    fn overpayment_counts_as_paid() {
        let mut payment = Payment::default();
        payment.apply_ln(invoice(1000, false, false));
        payment.apply_btc(receipt(0.00001500));
        assert!(payment.btc_paid);
        assert!(payment.paid);
    }
}
