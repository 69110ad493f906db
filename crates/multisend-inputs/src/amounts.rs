use crate::errors::{InputError, InputResult};
use ethers::{
    types::U256,
    utils::{format_units, parse_units},
};

/// Convert a human amount such as `"1.5"` into raw units for an asset with `decimals`
pub fn parse_amount(input: &str, decimals: u8) -> InputResult<U256> {
    let text = input.trim();
    let invalid = |reason: &str| InputError::InvalidAmount {
        input: input.to_string(),
        reason: reason.to_string(),
    };

    if text.is_empty() {
        return Err(invalid("empty"));
    }
    if text.starts_with('-') {
        return Err(invalid("must not be negative"));
    }
    if let Some((_, fraction)) = text.split_once('.') {
        if fraction.len() > usize::from(decimals) {
            return Err(invalid(&format!("more than {} decimal places", decimals)));
        }
    }

    let amount: U256 = parse_units(text, u32::from(decimals))
        .map_err(|e| invalid(&e.to_string()))?
        .into();
    if amount.is_zero() {
        return Err(invalid("must be greater than zero"));
    }
    Ok(amount)
}

/// Render raw units as a decimal string without trailing zeros
pub fn format_amount(amount: U256, decimals: u8) -> String {
    match format_units(amount, u32::from(decimals)) {
        Ok(text) if text.contains('.') => text
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
        Ok(text) => text,
        Err(_) => amount.to_string(),
    }
}
