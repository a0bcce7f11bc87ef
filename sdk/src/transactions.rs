//! Journal of fiat deposits and withdrawals settled against accounts.
//!
//! Records are keyed by `(address, currency, transaction_hash)`: replaying
//! the same payment returns the stored record instead of applying it twice.
//! A hash already journaled under the other kind is refused.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use fiat_pool::{normalize_symbol, PoolError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Fiat paid in by the account holder
    #[default]
    Deposit,
    /// Fiat paid out to the account holder
    Withdrawal,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Deposit    => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiatTransaction {
    /// Snapshots written before withdrawals existed carry no kind
    #[serde(default)]
    pub kind: TransactionKind,
    pub address: String,
    pub currency: String,
    /// Whole fiat units
    #[serde(with = "fiat_pool::decimal")]
    pub amount: u128,
    pub transaction_hash: String,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub status: TransactionStatus,
}

type TransactionKey = (String, String, String);

#[derive(Debug, Default)]
pub struct TransactionJournal {
    records: RwLock<BTreeMap<TransactionKey, FiatTransaction>>,
}

impl TransactionJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from saved records, refusing duplicates and any account whose
    /// withdrawals exceed its deposits.
    pub fn from_records(records: Vec<FiatTransaction>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for record in records {
            let key = key_of(&record.address, &record.currency, &record.transaction_hash);
            if map.insert(key, record).is_some() {
                return Err(PoolError::CorruptSnapshot("duplicate fiat transaction record".into()).into());
            }
        }
        let journal = Self { records: RwLock::new(map) };
        journal.check_balances()?;
        Ok(journal)
    }

    /// Record a deposit or withdrawal. `address` must already be normalized;
    /// `currency` existence is the caller's concern.
    ///
    /// A withdrawal may not exceed the account's [`balance`](Self::balance)
    /// in that currency. Returns the stored record and whether it was newly
    /// inserted.
    pub fn record(
        &self,
        kind: TransactionKind,
        address: &str,
        currency: &str,
        amount: u128,
        transaction_hash: &str,
    ) -> Result<(FiatTransaction, bool)> {
        if amount == 0 {
            return Err(PoolError::InvalidAmount("fiat amount must be greater than zero").into());
        }
        let transaction_hash = transaction_hash.trim();
        if transaction_hash.is_empty() {
            return Err(Error::InvalidArgument("transaction hash is required".into()));
        }

        let key = key_of(address, currency, transaction_hash);
        let mut records = self.records.write();
        if let Some(existing) = records.get(&key) {
            if existing.kind != kind {
                return Err(Error::InvalidArgument(format!(
                    "transaction {transaction_hash} is already recorded as a {}",
                    existing.kind.as_str()
                )));
            }
            tracing::debug!(%address, currency = %existing.currency, %transaction_hash, kind = kind.as_str(), "fiat transaction already recorded");
            return Ok((existing.clone(), false));
        }

        if kind == TransactionKind::Withdrawal {
            let available = balance_in(&records, &key.0, &key.1);
            if amount > available {
                return Err(Error::InsufficientFiatBalance { requested: amount, available });
            }
        }

        let record = FiatTransaction {
            kind,
            address: key.0.clone(),
            currency: key.1.clone(),
            amount,
            transaction_hash: transaction_hash.to_string(),
            timestamp: now_millis(),
            status: TransactionStatus::Completed,
        };
        records.insert(key, record.clone());
        tracing::info!(%address, currency = %record.currency, amount = %amount, %transaction_hash, kind = kind.as_str(), "fiat transaction recorded");
        Ok((record, true))
    }

    /// Deposits minus withdrawals for `address` in `currency`.
    pub fn balance(&self, address: &str, currency: &str) -> u128 {
        let address = address.trim().to_ascii_lowercase();
        balance_in(&self.records.read(), &address, &normalize_symbol(currency))
    }

    /// Transactions of `address`, oldest first.
    pub fn for_address(&self, address: &str) -> Vec<FiatTransaction> {
        let address = address.trim().to_ascii_lowercase();
        let mut out: Vec<FiatTransaction> = self
            .records
            .read()
            .values()
            .filter(|t| t.address == address)
            .cloned()
            .collect();
        out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.transaction_hash.cmp(&b.transaction_hash)));
        out
    }

    pub fn records(&self) -> Vec<FiatTransaction> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn check_balances(&self) -> Result<()> {
        let records = self.records.read();
        let mut totals: BTreeMap<(&str, &str), (u128, u128)> = BTreeMap::new();
        for record in records.values() {
            let entry = totals.entry((record.address.as_str(), record.currency.as_str())).or_default();
            let side = match record.kind {
                TransactionKind::Deposit    => &mut entry.0,
                TransactionKind::Withdrawal => &mut entry.1,
            };
            *side = side.checked_add(record.amount).ok_or(PoolError::MathOverflow)?;
        }
        for ((address, currency), (deposited, withdrawn)) in totals {
            if withdrawn > deposited {
                return Err(PoolError::CorruptSnapshot(format!(
                    "{address} withdrew {withdrawn} {currency} against {deposited} deposited"
                ))
                .into());
            }
        }
        Ok(())
    }
}

/// Deposits minus withdrawals, floored at zero.
fn balance_in(records: &BTreeMap<TransactionKey, FiatTransaction>, address: &str, currency: &str) -> u128 {
    let (deposited, withdrawn) = records
        .values()
        .filter(|t| t.address == address && t.currency == currency)
        .fold((0u128, 0u128), |(d, w), t| match t.kind {
            TransactionKind::Deposit    => (d.saturating_add(t.amount), w),
            TransactionKind::Withdrawal => (d, w.saturating_add(t.amount)),
        });
    deposited.saturating_sub(withdrawn)
}

fn key_of(address: &str, currency: &str, transaction_hash: &str) -> TransactionKey {
    (
        address.trim().to_ascii_lowercase(),
        normalize_symbol(currency),
        transaction_hash.trim().to_ascii_lowercase(),
    )
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use TransactionKind::{Deposit, Withdrawal};

    const ALICE: &str = "0x00000000000000000000000000000000000a11ce";

    #[test]
    fn replay_returns_original_record() {
        let journal = TransactionJournal::new();
        let (first, inserted) = journal.record(Deposit, ALICE, "usd", 500, "0xBEEF").unwrap();
        assert!(inserted);
        assert_eq!(first.currency, "USD");
        assert_eq!(first.kind, Deposit);
        assert_eq!(first.status, TransactionStatus::Completed);

        let (again, inserted) = journal.record(Deposit, ALICE, "USD", 999, "0xbeef").unwrap();
        assert!(!inserted);
        assert_eq!(again, first);
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn same_hash_different_currency_is_distinct() {
        let journal = TransactionJournal::new();
        journal.record(Deposit, ALICE, "USD", 1, "0x01").unwrap();
        journal.record(Deposit, ALICE, "EUR", 1, "0x01").unwrap();
        assert_eq!(journal.for_address(ALICE).len(), 2);
        assert!(journal.for_address("0x0000000000000000000000000000000000000b0b").is_empty());
    }

    #[test]
    fn withdrawals_draw_down_the_balance() {
        let journal = TransactionJournal::new();
        journal.record(Deposit, ALICE, "USD", 500, "0x01").unwrap();
        journal.record(Deposit, ALICE, "EUR", 900, "0x02").unwrap();

        let (w, inserted) = journal.record(Withdrawal, ALICE, "usd", 200, "0x03").unwrap();
        assert!(inserted);
        assert_eq!(w.kind, Withdrawal);
        assert_eq!(journal.balance(ALICE, "USD"), 300);
        assert_eq!(journal.balance(ALICE, "EUR"), 900);

        // replay is idempotent and does not withdraw twice
        let (again, inserted) = journal.record(Withdrawal, ALICE, "USD", 200, "0x03").unwrap();
        assert!(!inserted);
        assert_eq!(again, w);
        assert_eq!(journal.balance(ALICE, "USD"), 300);
    }

    #[test]
    fn overdrawn_withdrawal_is_refused() {
        let journal = TransactionJournal::new();
        journal.record(Deposit, ALICE, "USD", 100, "0x01").unwrap();
        assert!(matches!(
            journal.record(Withdrawal, ALICE, "USD", 101, "0x02"),
            Err(Error::InsufficientFiatBalance { requested: 101, available: 100 })
        ));
        assert!(matches!(
            journal.record(Withdrawal, ALICE, "GBP", 1, "0x03"),
            Err(Error::InsufficientFiatBalance { requested: 1, available: 0 })
        ));
        assert_eq!(journal.len(), 1);
    }

    #[test]
    fn hash_cannot_switch_kind() {
        let journal = TransactionJournal::new();
        journal.record(Deposit, ALICE, "USD", 100, "0x01").unwrap();
        assert!(matches!(
            journal.record(Withdrawal, ALICE, "USD", 50, "0x01"),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(journal.balance(ALICE, "USD"), 100);
    }

    #[test]
    fn rejects_empty_inputs() {
        let journal = TransactionJournal::new();
        assert!(matches!(
            journal.record(Deposit, ALICE, "USD", 0, "0x01"),
            Err(Error::Pool(PoolError::InvalidAmount(_)))
        ));
        assert!(matches!(journal.record(Deposit, ALICE, "USD", 5, "  "), Err(Error::InvalidArgument(_))));
        assert!(journal.is_empty());
    }

    #[test]
    fn corrupt_record_sets_are_refused() {
        let journal = TransactionJournal::new();
        let (d, _) = journal.record(Deposit, ALICE, "USD", 5, "0x01").unwrap();
        assert!(TransactionJournal::from_records(vec![d.clone(), d.clone()]).is_err());

        let overdrawn = FiatTransaction {
            kind: Withdrawal,
            amount: 6,
            transaction_hash: "0x02".into(),
            ..d.clone()
        };
        assert!(matches!(
            TransactionJournal::from_records(vec![d, overdrawn]),
            Err(Error::Pool(PoolError::CorruptSnapshot(_)))
        ));
    }

    #[test]
    fn records_without_kind_load_as_deposits() {
        let json = r#"{"address":"0xa","currency":"USD","amount":"5","transactionHash":"0x01","timestamp":1,"status":"completed"}"#;
        let record: FiatTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind, Deposit);
    }
}
