use bigdecimal::{BigDecimal, Zero};
use common_money::{clamp_to, display_amount, normalize_scale, percent_of, round_with, RoundingMode};

use crate::model::{DiscountCode, DiscountType};

/// Amount taken off `subtotal`, rounded to cents and never above the subtotal.
pub fn amount_off(discount: &DiscountCode, subtotal: &BigDecimal) -> BigDecimal {
    // whole cents at or below the subtotal
    let ceiling = round_with(subtotal, RoundingMode::Truncate);
    if ceiling <= BigDecimal::zero() {
        return BigDecimal::zero().with_scale(2);
    }
    let raw = match discount.discount_type {
        DiscountType::Percentage => {
            let pct = percent_of(subtotal, &discount.discount_value);
            match discount.maximum_discount.as_ref() {
                Some(cap) if &pct > cap => cap.clone(),
                _ => pct,
            }
        }
        DiscountType::Fixed => discount.discount_value.clone(),
    };
    clamp_to(normalize_scale(&raw), &ceiling)
}

pub fn format_display(discount: &DiscountCode) -> String {
    let value = display_amount(&discount.discount_value);
    let base = match discount.discount_type {
        DiscountType::Percentage => format!("{value}% off"),
        DiscountType::Fixed => format!("${value} off"),
    };
    if discount.first_purchase_only {
        format!("{base} - Welcome discount!")
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eligibility::tests::{dec, discount};

    #[test]
    fn percentage_without_cap() {
        let mut d = discount("TEN");
        d.discount_value = dec("15");
        assert_eq!(amount_off(&d, &dec("80")), dec("12.00"));
    }

    #[test]
    fn percentage_with_cap() {
        let mut d = discount("CAPPED");
        d.discount_value = dec("50");
        d.maximum_discount = Some(dec("20"));
        assert_eq!(amount_off(&d, &dec("100")), dec("20"));
        assert_eq!(amount_off(&d, &dec("30")), dec("15"));
    }

    #[test]
    fn fixed_is_clamped_to_subtotal() {
        let mut d = discount("FIVE");
        d.discount_type = DiscountType::Fixed;
        d.discount_value = dec("25");
        assert_eq!(amount_off(&d, &dec("100")), dec("25"));
        assert_eq!(amount_off(&d, &dec("10.50")), dec("10.50"));
        assert_eq!(amount_off(&d, &dec("0")), dec("0"));
    }

    #[test]
    fn sub_cent_subtotal_never_rounds_above_itself() {
        let mut d = discount("TWENTY");
        d.discount_type = DiscountType::Fixed;
        d.discount_value = dec("20");
        let subtotal = dec("0.999");
        let off = amount_off(&d, &subtotal);
        assert!(off <= subtotal);
        assert_eq!(off, dec("0.99"));

        let mut full = discount("ALL");
        full.discount_value = dec("100");
        assert_eq!(amount_off(&full, &dec("10.005")), dec("10.00"));
    }

    #[test]
    fn rounds_to_cents() {
        let mut d = discount("THIRD");
        d.discount_value = dec("33.333");
        assert_eq!(amount_off(&d, &dec("10")), dec("3.33"));
    }

    #[test]
    fn display_strings() {
        let mut d = discount("WELCOME30");
        d.discount_value = dec("30.00");
        assert_eq!(format_display(&d), "30% off");
        d.first_purchase_only = true;
        assert_eq!(format_display(&d), "30% off - Welcome discount!");

        let mut f = discount("FIVE");
        f.discount_type = DiscountType::Fixed;
        f.discount_value = dec("5.50");
        assert_eq!(format_display(&f), "$5.5 off");
    }
}
