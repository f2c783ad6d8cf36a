//! 金额换算
//!
//! 余额在内部始终是最小单位整数（lamport / wei，u128）。
//! 原生单位的小数形式只在展示边界或用户输入时出现，且只用 Decimal 精确换算，不经过浮点数。

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::domain::chain_profile::ChainProfile;
use crate::error::{WalletError, WalletResult};

/// 最小单位 → 原生单位（精确）
///
/// Decimal 尾数为 96 位，超出范围的余额返回 InvalidAmount
pub fn to_native(smallest_units: u128, profile: &ChainProfile) -> WalletResult<Decimal> {
    let raw = i128::try_from(smallest_units)
        .map_err(|_| WalletError::InvalidAmount(format!("{} out of range", smallest_units)))?;

    Decimal::try_from_i128_with_scale(raw, profile.decimals)
        .map(|d| d.normalize())
        .map_err(|e| WalletError::InvalidAmount(format!("{} out of range: {}", smallest_units, e)))
}

/// 原生单位 → 最小单位（精确）
///
/// 负数、零以及比最小单位更细的金额都会被拒绝
pub fn to_smallest_units(amount_native: Decimal, profile: &ChainProfile) -> WalletResult<u128> {
    if amount_native <= Decimal::ZERO {
        return Err(WalletError::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount_native
        )));
    }

    if amount_native.normalize().scale() > profile.decimals {
        return Err(WalletError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount_native, profile.decimals
        )));
    }

    // 整数部分和小数部分分开换算，避免 Decimal 乘法溢出 96 位尾数
    let whole = amount_native.trunc();
    let fraction = amount_native - whole;

    let whole_units = whole
        .to_u128()
        .and_then(|w| w.checked_mul(profile.smallest_unit_per_native()))
        .ok_or_else(|| WalletError::InvalidAmount(format!("{} is too large", amount_native)))?;

    let scale = fraction.normalize().scale();
    let mantissa = fraction.normalize().mantissa();
    let fraction_units = u128::try_from(mantissa)
        .ok()
        .and_then(|m| m.checked_mul(10u128.pow(profile.decimals - scale)))
        .ok_or_else(|| WalletError::InvalidAmount(format!("{} is invalid", amount_native)))?;

    whole_units
        .checked_add(fraction_units)
        .ok_or_else(|| WalletError::InvalidAmount(format!("{} is too large", amount_native)))
}

/// 展示用格式化："1.5 SOL"
///
/// 完全由整数除法完成，任意 u128 余额都能格式化
pub fn format_native(smallest_units: u128, profile: &ChainProfile) -> String {
    let unit = profile.smallest_unit_per_native();
    let whole = smallest_units / unit;
    let fraction = smallest_units % unit;

    if fraction == 0 {
        return format!("{} {}", whole, profile.native_unit_name);
    }

    let digits = format!("{:0width$}", fraction, width = profile.decimals as usize);
    format!(
        "{}.{} {}",
        whole,
        digits.trim_end_matches('0'),
        profile.native_unit_name
    )
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::chain_profile::{ETHEREUM, SOLANA};

    #[test]
    fn test_one_sol() {
        assert_eq!(to_native(1_000_000_000, &SOLANA).unwrap(), Decimal::ONE);
        assert_eq!(to_native(1_000_000_000, &SOLANA).unwrap().to_string(), "1");
    }

    #[test]
    fn test_one_eth_from_hex() {
        let wei = u128::from_str_radix("DE0B6B3A7640000", 16).unwrap();
        assert_eq!(wei, 1_000_000_000_000_000_000);
        assert_eq!(to_native(wei, &ETHEREUM).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_fractional_values_are_exact() {
        assert_eq!(
            to_native(1, &ETHEREUM).unwrap(),
            Decimal::from_str("0.000000000000000001").unwrap()
        );
        assert_eq!(
            to_native(1_500_000_001, &SOLANA).unwrap(),
            Decimal::from_str("1.500000001").unwrap()
        );
    }

    #[test]
    fn test_to_smallest_units() {
        let half = Decimal::from_str("0.5").unwrap();
        assert_eq!(to_smallest_units(half, &SOLANA).unwrap(), 500_000_000);
        assert_eq!(
            to_smallest_units(Decimal::from_str("1.000000000000000001").unwrap(), &ETHEREUM)
                .unwrap(),
            1_000_000_000_000_000_001
        );
        assert_eq!(
            to_smallest_units(Decimal::from(12), &ETHEREUM).unwrap(),
            12_000_000_000_000_000_000
        );
        // 多余的尾随零不算精度
        assert_eq!(
            to_smallest_units(Decimal::from_str("2.0000000000").unwrap(), &SOLANA).unwrap(),
            2_000_000_000
        );
    }

    #[test]
    fn test_to_smallest_units_rejects_bad_amounts() {
        assert!(to_smallest_units(Decimal::ZERO, &SOLANA).is_err());
        assert!(to_smallest_units(Decimal::from(-1), &SOLANA).is_err());
        // 比 lamport 更细
        assert!(matches!(
            to_smallest_units(Decimal::from_str("0.0000000001").unwrap(), &SOLANA),
            Err(WalletError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_format_native() {
        assert_eq!(format_native(1_000_000_000, &SOLANA), "1 SOL");
        assert_eq!(format_native(1_250_000_000, &SOLANA), "1.25 SOL");
        assert_eq!(format_native(1, &ETHEREUM), "0.000000000000000001 ETH");
        assert_eq!(format_native(0, &ETHEREUM), "0 ETH");
        assert_eq!(
            format_native(u128::MAX, &ETHEREUM),
            "340282366920938463463.374607431768211455 ETH"
        );
    }
}
