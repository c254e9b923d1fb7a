//! Transaction model
//!
//! One bank ledger line. Transactions are immutable once imported; the only
//! mutation is merge-dedup during import. The wire shape (camelCase keys,
//! decimal amounts, "DD.MM.YYYY" dates) matches exported session files.

use serde::{Deserialize, Serialize};

use super::date::LedgerDate;
use super::money::Money;

/// A single bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Booking date
    pub date: LedgerDate,

    /// Recipient and sender are often in the same bank CSV column
    pub recipient_sender: String,

    /// Booking type, e.g. "Lastschrift", "Überweisung"
    #[serde(rename = "type")]
    pub kind: String,

    /// Free-text purpose line
    pub description: String,

    /// Account balance after this transaction
    pub balance: Money,

    /// Signed amount; negative = expense, positive = earning
    pub value: Money,

    /// Currency code, e.g. "EUR"
    pub currency: String,
}

impl Transaction {
    /// Identity key for import dedup
    ///
    /// Two stored transactions may never share this key. The key deliberately
    /// leaves out `balance`: re-exports of the same booking can carry a
    /// different running balance.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}{}{}{}",
            self.date,
            self.recipient_sender,
            self.value.cents(),
            self.description
        )
    }
}
