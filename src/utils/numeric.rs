use crate::error::AppError;

/// Decodes a `0x`-prefixed hexadecimal quantity as returned by the JSON-RPC proxy endpoints.
pub fn decode_hex_u64(value: &str) -> Result<u64, AppError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(|| AppError::DecodeError(format!("missing 0x prefix: {:?}", value)))?;

    if digits.is_empty() {
        return Err(AppError::DecodeError(format!("empty hex quantity: {:?}", value)));
    }

    u64::from_str_radix(digits, 16)
        .map_err(|e| AppError::DecodeError(format!("invalid hex quantity {:?}: {}", value, e)))
}

/// Decodes a quantity that is either `0x` hex or plain base-10.
///
/// The account module of the explorer emits base-10 strings while the proxy
/// module emits hex, so list payloads go through this.
pub fn decode_quantity(value: &str) -> Result<u64, AppError> {
    let trimmed = value.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        return decode_hex_u64(trimmed);
    }

    trimmed
        .parse::<u64>()
        .map_err(|e| AppError::DecodeError(format!("invalid quantity {:?}: {}", value, e)))
}

pub fn encode_hex_u64(value: u64) -> String {
    format!("{:#x}", value)
}
