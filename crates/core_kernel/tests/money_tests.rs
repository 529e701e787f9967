//! Unit tests for the Money module
//!
//! Tests cover money creation, the non-negative guard, currency handling,
//! and formatting.

use core_kernel::{Currency, Money, MoneyError};
use rust_decimal_macros::dec;

mod creation {
    use super::*;

    #[test]
    fn test_new_rounds_to_four_decimal_places() {
        let m = Money::new(dec!(100.123456789), Currency::USD);
        assert_eq!(m.amount(), dec!(100.1235));
    }

    #[test]
    fn test_zero_creates_zero_amount() {
        let m = Money::zero(Currency::VND);
        assert!(m.is_zero());
        assert_eq!(m.currency(), Currency::VND);
    }

    #[test]
    fn test_non_negative_rejects_negative_amounts() {
        assert!(matches!(
            Money::non_negative(dec!(-0.01), Currency::VND),
            Err(MoneyError::InvalidAmount(_))
        ));
        assert_eq!(
            Money::non_negative(dec!(150000), Currency::VND).unwrap().amount(),
            dec!(150000)
        );
    }
}

mod currency {
    use super::*;

    #[test]
    fn test_unknown_currency_code() {
        assert_eq!(
            "ABC".parse::<Currency>(),
            Err(MoneyError::UnknownCurrency("ABC".to_string()))
        );
        assert_eq!("usd".parse::<Currency>(), Ok(Currency::USD));
    }
}

mod formatting {
    use super::*;

    #[test]
    fn test_display_uses_currency_precision() {
        assert_eq!(Money::new(dec!(12.5), Currency::USD).to_string(), "$ 12.50");
        assert_eq!(Money::new(dec!(250000), Currency::VND).to_string(), "₫ 250000");
    }
}
