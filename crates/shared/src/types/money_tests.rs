use super::*;
use rust_decimal_macros::dec;

#[test]
fn test_money_new() {
    let amount = dec!(100.00);
    let money = Money::new(amount, CurrencyCode::CAD);
    assert_eq!(money.amount, amount);
    assert_eq!(money.currency, CurrencyCode::CAD);
}

#[test]
fn test_money_zero() {
    let money = Money::zero(CurrencyCode::IRR);
    assert!(money.is_zero());
    assert_eq!(money.amount, Decimal::ZERO);
}

#[test]
fn test_money_sign() {
    assert!(Money::new(dec!(10), CurrencyCode::CAD).is_positive());
    assert!(Money::new(dec!(-10), CurrencyCode::CAD).is_negative());
    let zero = Money::new(dec!(0), CurrencyCode::CAD);
    assert!(!zero.is_negative());
    assert!(!zero.is_positive());
}

#[test]
fn test_checked_add_same_currency() {
    let a = Money::new(dec!(10.50), CurrencyCode::CAD);
    let b = Money::new(dec!(4.25), CurrencyCode::CAD);
    assert_eq!(a.checked_add(b).unwrap().amount, dec!(14.75));
    assert_eq!(a.checked_sub(b).unwrap().amount, dec!(6.25));
}

#[test]
fn test_checked_ops_reject_mismatch() {
    let cad = Money::new(dec!(10), CurrencyCode::CAD);
    let irr = Money::new(dec!(10), CurrencyCode::IRR);

    let err = cad.checked_add(irr).unwrap_err();
    assert_eq!(
        err,
        MoneyError::CurrencyMismatch {
            expected: CurrencyCode::CAD,
            got: CurrencyCode::IRR,
        }
    );
    assert!(cad.checked_sub(irr).is_err());
    assert!(cad.checked_min(irr).is_err());
}

#[test]
fn test_checked_min() {
    let a = Money::new(dec!(6000000), CurrencyCode::IRR);
    let b = Money::new(dec!(10000000), CurrencyCode::IRR);
    assert_eq!(a.checked_min(b).unwrap(), a);
    assert_eq!(b.checked_min(a).unwrap(), a);
}

#[test]
fn test_divide_by_rate_rounds_to_cents() {
    // 10,000,000 IRR at 80,000 IRR/CAD = 125 CAD
    let irr = Money::new(dec!(10000000), CurrencyCode::IRR);
    let cad = irr.divide_by_rate(dec!(80000), CurrencyCode::CAD).unwrap();
    assert_eq!(cad, Money::new(dec!(125.00), CurrencyCode::CAD));

    // 6,000,000 / 81,000 = 74.074... -> 74.07
    let irr = Money::new(dec!(6000000), CurrencyCode::IRR);
    let cad = irr.divide_by_rate(dec!(81000), CurrencyCode::CAD).unwrap();
    assert_eq!(cad.amount, dec!(74.07));
}

#[test]
fn test_convert_rejects_non_positive_rate() {
    let cad = Money::new(dec!(10), CurrencyCode::CAD);
    assert_eq!(
        cad.convert(Decimal::ZERO, CurrencyCode::IRR),
        Err(MoneyError::InvalidRate(Decimal::ZERO))
    );
    assert!(cad.divide_by_rate(dec!(-1), CurrencyCode::IRR).is_err());
}

#[test]
fn test_convert_uses_bankers_rounding() {
    // 1.125 CAD * 1 = 1.125 -> 1.12 (round half to even)
    let cad = Money::new(dec!(1.125), CurrencyCode::CAD);
    assert_eq!(cad.convert(Decimal::ONE, CurrencyCode::USD).unwrap().amount, dec!(1.12));
}

#[test]
fn test_currency_display() {
    assert_eq!(CurrencyCode::CAD.to_string(), "CAD");
    assert_eq!(CurrencyCode::IRR.to_string(), "IRR");
    assert_eq!(CurrencyCode::USDT.to_string(), "USDT");
}

#[test]
fn test_currency_from_str() {
    assert_eq!(CurrencyCode::from_str("CAD").unwrap(), CurrencyCode::CAD);
    assert_eq!(CurrencyCode::from_str("irr").unwrap(), CurrencyCode::IRR);
    assert_eq!(CurrencyCode::from_str("usdt").unwrap(), CurrencyCode::USDT);

    assert!(CurrencyCode::from_str("").is_err());
    assert!(CurrencyCode::from_str("CA").is_err());
    assert!(CurrencyCode::from_str("CADXX").is_err());
    assert!(CurrencyCode::from_str("C4D").is_err());
}

#[test]
fn test_currency_decimal_places() {
    assert_eq!(CurrencyCode::IRR.decimal_places(), 0);
    assert_eq!(CurrencyCode::CAD.decimal_places(), 2);
    assert_eq!(CurrencyCode::CAD.minor_unit(), dec!(0.01));
}

#[test]
fn test_money_serde_roundtrip() {
    let money = Money::new(dec!(12.34), CurrencyCode::CAD);
    let json = serde_json::to_string(&money).unwrap();
    assert_eq!(json, r#"{"amount":"12.34","currency":"CAD"}"#);
    let back: Money = serde_json::from_str(&json).unwrap();
    assert_eq!(back, money);

    let bad = serde_json::from_str::<Money>(r#"{"amount":"1","currency":"C1"}"#);
    assert!(bad.is_err());
}
