use crate::rpc::U256;

/// Render a raw token amount with `decimals` fractional digits, trimming trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u32) -> String {
	let scale = U256::exp10(decimals as usize);
	let (whole, fraction) = amount.div_mod(scale);
	if fraction.is_zero() {
		return whole.to_string();
	}
	let digits = format!("{:0>width$}", fraction.to_string(), width = decimals as usize);
	format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Sum of raw token amounts, saturating at `type(uint256).max`.
pub fn sum_token_amounts<'a>(amounts: impl IntoIterator<Item = &'a U256>) -> U256 {
	amounts
		.into_iter()
		.fold(U256::zero(), |total, amount| total.saturating_add(*amount))
}
