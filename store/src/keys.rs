/// Prefix shared by every identity row.
pub const RECORD_PREFIX: &str = "faceid:rec:";

/// Next id to assign. Survives removal of the highest id.
pub const META_NEXT_ID: &str = "faceid:meta:next_id";

/// Established embedding dimension.
pub const META_DIM: &str = "faceid:meta:dim";

/// Build the key for an identity row.
/// Format: `faceid:rec:{id_20d}`
///
/// Zero-padded so that prefix scans return rows in id order.
pub fn record_key(id: u64) -> String {
    format!("{RECORD_PREFIX}{id:020}")
}

/// Extract the id from a row key, or None if the key is malformed.
pub fn parse_record_key(key: &str) -> Option<u64> {
    key.strip_prefix(RECORD_PREFIX)?.parse().ok()
}
