//! Client balance calculations.
//!
//! A balance is the plain sum of every entry for a (client, currency) pair.
//! Reversals are ordinary entries with the opposite sign, so nothing is ever
//! filtered out of the fold.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{ClientId, CurrencyCode, Money, MoneyError};

use super::entry::LedgerEntry;

/// Running balance information for a ledger entry.
///
/// - `version`: position of the entry in the (client, currency) history, from 1
/// - `previous_balance`: balance before this entry
/// - `current_balance`: balance after this entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Entry position (monotonically increasing).
    pub version: u64,
    /// Balance before this entry.
    pub previous_balance: Decimal,
    /// Balance after this entry.
    pub current_balance: Decimal,
}

impl RunningBalance {
    /// Creates a new running balance for the first entry of a history.
    #[must_use]
    pub fn first_entry(balance_change: Decimal) -> Self {
        Self {
            version: 1,
            previous_balance: Decimal::ZERO,
            current_balance: balance_change,
        }
    }

    /// Creates a new running balance based on the previous entry.
    ///
    /// - current_balance[N] = previous_balance[N] + balance_change
    /// - previous_balance[N] = current_balance[N-1]
    #[must_use]
    pub fn next_entry(previous: &Self, balance_change: Decimal) -> Self {
        Self {
            version: previous.version + 1,
            previous_balance: previous.current_balance,
            current_balance: previous.current_balance + balance_change,
        }
    }
}

/// One line of a client statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// The entry.
    pub entry: LedgerEntry,
    /// Balance around the entry.
    pub running: RunningBalance,
}

/// Balance of one client in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBalance {
    /// The client.
    pub client_id: ClientId,
    /// Signed balance; positive means the exchange owes the client.
    pub balance: Money,
    /// Number of entries folded.
    pub entry_count: usize,
}

/// Sums the entries of one currency.
///
/// # Errors
///
/// Returns `CurrencyMismatch` if any entry is in another currency.
pub fn fold_balance(currency: CurrencyCode, entries: &[LedgerEntry]) -> Result<Money, MoneyError> {
    entries
        .iter()
        .try_fold(Money::zero(currency), |acc, e| acc.checked_add(e.amount))
}

/// Builds a statement with running balances, in entry order.
///
/// # Errors
///
/// Returns `CurrencyMismatch` if the entries mix currencies.
pub fn build_statement(entries: Vec<LedgerEntry>) -> Result<Vec<StatementLine>, MoneyError> {
    let Some(currency) = entries.first().map(|e| e.amount.currency) else {
        return Ok(Vec::new());
    };

    let mut lines: Vec<StatementLine> = Vec::with_capacity(entries.len());
    for entry in entries {
        Money::zero(currency).ensure_same_currency(&entry.amount)?;
        let running = match lines.last() {
            Some(prev) => RunningBalance::next_entry(&prev.running, entry.amount.amount),
            None => RunningBalance::first_entry(entry.amount.amount),
        };
        lines.push(StatementLine { entry, running });
    }
    Ok(lines)
}

/// Groups a client's entries into one balance per currency, ordered by code.
#[must_use]
pub fn balances_by_currency(client_id: ClientId, entries: &[LedgerEntry]) -> Vec<ClientBalance> {
    let mut sums: BTreeMap<CurrencyCode, (Decimal, usize)> = BTreeMap::new();
    for entry in entries {
        let slot = sums.entry(entry.amount.currency).or_insert((Decimal::ZERO, 0));
        slot.0 += entry.amount.amount;
        slot.1 += 1;
    }

    sums.into_iter()
        .map(|(currency, (amount, entry_count))| ClientBalance {
            client_id,
            balance: Money::new(amount, currency),
            entry_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use sarraf_shared::types::{LedgerEntryId, TenantId, UserId};

    use crate::ledger::entry::EntryType;

    fn entry(client_id: ClientId, amount: Decimal, currency: CurrencyCode) -> LedgerEntry {
        LedgerEntry {
            id: LedgerEntryId::new(),
            tenant_id: TenantId::new(),
            client_id,
            entry_type: if amount.is_sign_negative() {
                EntryType::Withdrawal
            } else {
                EntryType::Deposit
            },
            amount: Money::new(amount, currency),
            related_entry_id: None,
            source_transaction_id: None,
            description: None,
            created_by: UserId::new(),
            created_at: Utc::now(),
        }
    }

    /// Strategy for generating balance changes (can be positive or negative)
    fn balance_change_strategy() -> impl Strategy<Value = Decimal> {
        (-100_000i64..100_000i64).prop_map(|n| Decimal::new(n, 2))
    }

    /// Strategy for generating a sequence of balance changes
    fn balance_changes_strategy(max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
        prop::collection::vec(balance_change_strategy(), 1..=max_len)
    }

    fn chain(changes: &[Decimal]) -> Vec<RunningBalance> {
        let mut out: Vec<RunningBalance> = Vec::with_capacity(changes.len());
        for change in changes {
            let next = match out.last() {
                Some(prev) => RunningBalance::next_entry(prev, *change),
                None => RunningBalance::first_entry(*change),
            };
            out.push(next);
        }
        out
    }

    // ========================================================================
    // Property 1: Running Balance Consistency
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// *For any* consecutive entries, previous_balance[N] SHALL equal
        /// current_balance[N-1] and current = previous + change.
        #[test]
        fn prop_running_balance_links(
            changes in balance_changes_strategy(20),
        ) {
            let balances = chain(&changes);
            for (i, rb) in balances.iter().enumerate() {
                prop_assert_eq!(rb.current_balance, rb.previous_balance + changes[i]);
                if i > 0 {
                    prop_assert_eq!(rb.previous_balance, balances[i - 1].current_balance);
                }
            }
        }

        /// *For any* sequence of entries, the final balance SHALL equal the fold.
        #[test]
        fn prop_final_balance_equals_fold(
            changes in balance_changes_strategy(20),
        ) {
            let client = ClientId::new();
            let entries: Vec<LedgerEntry> = changes
                .iter()
                .map(|c| entry(client, *c, CurrencyCode::CAD))
                .collect();

            let folded = fold_balance(CurrencyCode::CAD, &entries).unwrap();
            let statement = build_statement(entries).unwrap();
            let last = statement.last().unwrap();

            prop_assert_eq!(last.running.current_balance, folded.amount);
            prop_assert_eq!(folded.amount, changes.iter().copied().sum::<Decimal>());
        }

        /// *For any* N entries, the versions SHALL form sequence [1, 2, ..., N].
        #[test]
        fn prop_version_sequence_contiguous(
            changes in balance_changes_strategy(20),
        ) {
            let versions: Vec<u64> = chain(&changes).iter().map(|rb| rb.version).collect();
            let expected: Vec<u64> = (1..=changes.len() as u64).collect();
            prop_assert_eq!(versions, expected);
        }
    }

    // ========================================================================
    // Unit tests for specific examples
    // ========================================================================

    #[test]
    fn test_running_balance_chain() {
        let rb1 = RunningBalance::first_entry(dec!(100));
        assert_eq!(rb1.version, 1);
        assert_eq!(rb1.previous_balance, dec!(0));

        let rb2 = RunningBalance::next_entry(&rb1, dec!(50));
        assert_eq!(rb2.version, 2);
        assert_eq!(rb2.previous_balance, dec!(100));
        assert_eq!(rb2.current_balance, dec!(150));

        let rb3 = RunningBalance::next_entry(&rb2, dec!(-30));
        assert_eq!(rb3.version, 3);
        assert_eq!(rb3.current_balance, dec!(120));
    }

    #[test]
    fn test_reversal_nets_to_zero() {
        let client = ClientId::new();
        let original = entry(client, dec!(500), CurrencyCode::CAD);
        let reversal = original.reversal("duplicate slip", UserId::new(), Utc::now());
        let balance = fold_balance(CurrencyCode::CAD, &[original, reversal]).unwrap();
        assert!(balance.is_zero());
    }

    #[test]
    fn test_fold_rejects_mixed_currency() {
        let client = ClientId::new();
        let entries = vec![
            entry(client, dec!(10), CurrencyCode::CAD),
            entry(client, dec!(10), CurrencyCode::IRR),
        ];
        assert!(fold_balance(CurrencyCode::CAD, &entries).is_err());
        assert!(build_statement(entries).is_err());
    }

    #[test]
    fn test_balances_by_currency() {
        let client = ClientId::new();
        let entries = vec![
            entry(client, dec!(100), CurrencyCode::CAD),
            entry(client, dec!(5000000), CurrencyCode::IRR),
            entry(client, dec!(-40), CurrencyCode::CAD),
        ];
        let balances = balances_by_currency(client, &entries);
        assert_eq!(balances.len(), 2);
        assert_eq!(balances[0].balance, Money::new(dec!(60), CurrencyCode::CAD));
        assert_eq!(balances[0].entry_count, 2);
        assert_eq!(balances[1].balance, Money::new(dec!(5000000), CurrencyCode::IRR));
    }

    #[test]
    fn test_empty_statement() {
        assert!(build_statement(Vec::new()).unwrap().is_empty());
    }
}
