//! Client ledger flows: deposits, FX pairs, reversals and statements.

mod common;

use common::Harness;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sarraf_core::audit::AuditAction;
use sarraf_core::ledger::{EntryType, PostEntryInput, PostExchangeInput};
use sarraf_shared::types::{ClientId, CurrencyCode, Money};
use sarraf_shared::ErrorKind;

fn deposit(h: &Harness, client_id: ClientId, currency: &str, amount: Decimal) -> PostEntryInput {
    PostEntryInput {
        client_id,
        entry_type: EntryType::Deposit,
        currency: currency.to_string(),
        amount,
        related_entry_id: None,
        source_transaction_id: None,
        description: None,
        actor: h.actor,
    }
}

fn exchange(h: &Harness, client_id: ClientId, sell: Decimal, buy: Option<Decimal>, rate: Option<Decimal>) -> PostExchangeInput {
    PostExchangeInput {
        client_id,
        sell_currency: "cad".to_string(),
        sell_amount: sell,
        buy_currency: "IRR".to_string(),
        buy_amount: buy,
        rate,
        source_transaction_id: None,
        actor: h.actor,
    }
}

#[tokio::test]
async fn test_exchange_posts_linked_legs() {
    let h = Harness::new();
    let client = h.store.add_client(h.tenant.id, "Dariush").unwrap();
    h.ledger.post_entry(h.tenant.id, deposit(&h, client.id, "CAD", dec!(500))).await.unwrap();

    let pair = h
        .ledger
        .post_exchange(h.tenant.id, exchange(&h, client.id, dec!(100), None, None))
        .await
        .unwrap();
    assert_eq!(pair.rate, dec!(80000));
    assert_eq!(pair.sell.entry_type, EntryType::FxSell);
    assert_eq!(pair.sell.amount, Money::new(dec!(-100), CurrencyCode::CAD));
    assert_eq!(pair.buy.amount, Money::new(dec!(8000000), CurrencyCode::IRR));
    assert_eq!(pair.sell.related_entry_id, Some(pair.buy.id));
    assert_eq!(pair.buy.related_entry_id, Some(pair.sell.id));

    let cad = h.ledger.balance(h.tenant.id, client.id, "CAD").await.unwrap();
    let irr = h.ledger.balance(h.tenant.id, client.id, "IRR").await.unwrap();
    assert_eq!(cad.amount, dec!(400));
    assert_eq!(irr.amount, dec!(8000000));
    assert_eq!(h.ledger.balances(h.tenant.id, client.id).await.unwrap().len(), 2);
    assert_eq!(h.audit.with_action(AuditAction::ExchangePosted).len(), 1);
}

#[tokio::test]
async fn test_exchange_amount_must_match_rate() {
    let h = Harness::new();
    let client = h.store.add_client(h.tenant.id, "Shirin").unwrap();

    // One rial off is tolerated.
    h.ledger
        .post_exchange(h.tenant.id, exchange(&h, client.id, dec!(10), Some(dec!(810001)), Some(dec!(81000))))
        .await
        .unwrap();

    let err = h
        .ledger
        .post_exchange(h.tenant.id, exchange(&h, client.id, dec!(10), Some(dec!(810500)), Some(dec!(81000))))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);

    let err = h
        .ledger
        .post_exchange(h.tenant.id, exchange(&h, client.id, dec!(0), None, None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidAmount);
}

#[tokio::test]
async fn test_reversal_negates_once() {
    let h = Harness::new();
    let client = h.store.add_client(h.tenant.id, "Kaveh").unwrap();
    let entry = h
        .ledger
        .post_entry(h.tenant.id, deposit(&h, client.id, "CAD", dec!(250)))
        .await
        .unwrap();

    let err = h.ledger.reverse_entry(h.tenant.id, entry.id, " ", h.actor).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let reversal = h
        .ledger
        .reverse_entry(h.tenant.id, entry.id, "wrong client", h.actor)
        .await
        .unwrap();
    assert_eq!(reversal.entry_type, EntryType::Reversal);
    assert_eq!(reversal.amount, Money::new(dec!(-250), CurrencyCode::CAD));
    assert_eq!(reversal.related_entry_id, Some(entry.id));
    assert!(h.ledger.balance(h.tenant.id, client.id, "CAD").await.unwrap().is_zero());

    let err = h
        .ledger
        .reverse_entry(h.tenant.id, entry.id, "again", h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let err = h
        .ledger
        .reverse_entry(h.tenant.id, reversal.id, "undo the undo", h.actor)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
}

#[tokio::test]
async fn test_statement_runs_balances_in_order() {
    let h = Harness::new();
    let client = h.store.add_client(h.tenant.id, "Nasrin").unwrap();
    for amount in [dec!(100), dec!(-30), dec!(45.50)] {
        h.ledger
            .post_entry(h.tenant.id, deposit(&h, client.id, "CAD", amount))
            .await
            .unwrap();
    }

    let lines = h.ledger.statement(h.tenant.id, client.id, "CAD").await.unwrap();
    let running: Vec<_> = lines.iter().map(|l| l.running.current_balance).collect();
    assert_eq!(running, vec![dec!(100), dec!(70), dec!(115.50)]);
    assert_eq!(lines[1].running.previous_balance, dec!(100));
}

#[tokio::test]
async fn test_deleted_and_foreign_clients_are_not_found() {
    let h = Harness::new();
    let client = h.store.add_client(h.tenant.id, "Parviz").unwrap();
    h.store.delete_client(h.tenant.id, client.id).unwrap();

    let err = h
        .ledger
        .post_entry(h.tenant.id, deposit(&h, client.id, "CAD", dec!(10)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let other = h.store.register_tenant("Montreal", CurrencyCode::CAD);
    let theirs = h.store.add_client(other.id, "Leila").unwrap();
    let err = h.ledger.balance(h.tenant.id, theirs.id, "CAD").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = h
        .ledger
        .post_entry(h.tenant.id, deposit(&h, h.tenant.house_client_id, "XX", dec!(1)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidCurrency);
}
