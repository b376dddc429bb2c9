//! # Barcode Generation
//!
//! Items created without a barcode get one generated from their category,
//! supplier, the creation time and a random suffix:
//!
//! ```text
//!   C004-S012-250314093015-K7QZ2MXA
//!   ─┬── ─┬── ─────┬────── ───┬────
//!    │    │        │          └── 8 chars, RFC 4648 base32, OS CSPRNG
//!    │    │        └── yyMMddHHmmss (UTC)
//!    │    └── supplier id, zero padded (0 when unset)
//!    └── category id, zero padded (0 when unset)
//! ```
//!
//! Uniqueness is not guaranteed by construction; the item manager re-checks
//! each candidate and retries a bounded number of times.

use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{CoreError, CoreResult};

/// RFC 4648 base32 alphabet.
const BASE32_ALPHABET: &[u8; 32] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Length of the random suffix.
pub const SUFFIX_LEN: usize = 8;

/// Produces barcode candidates for new items.
///
/// Injected into the item manager so tests can force collisions.
pub trait BarcodeGenerator: Send + Sync {
    fn generate(&self, category_id: Option<i64>, supplier_id: Option<i64>) -> CoreResult<String>;
}

/// Generator backed by the system clock and the OS random source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBarcodeGenerator;

impl BarcodeGenerator for SystemBarcodeGenerator {
    fn generate(&self, category_id: Option<i64>, supplier_id: Option<i64>) -> CoreResult<String> {
        let mut bytes = [0u8; 5];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| CoreError::EntropyUnavailable(e.to_string()))?;

        Ok(format_barcode(
            category_id.unwrap_or(0),
            supplier_id.unwrap_or(0),
            Utc::now(),
            &bytes,
        ))
    }
}

/// Formats a barcode from its parts.
///
/// The 5 random bytes carry exactly the 40 bits the 8 base32 characters
/// encode.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use fixparts_core::barcode::format_barcode;
///
/// let at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 15).unwrap();
/// let code = format_barcode(4, 12, at, &[0, 0, 0, 0, 0]);
/// assert_eq!(code, "C004-S012-250314093015-AAAAAAAA");
/// ```
pub fn format_barcode(
    category_id: i64,
    supplier_id: i64,
    at: DateTime<Utc>,
    random: &[u8; 5],
) -> String {
    format!(
        "C{:03}-S{:03}-{}-{}",
        category_id,
        supplier_id,
        at.format("%y%m%d%H%M%S"),
        encode_base32(random)
    )
}

fn encode_base32(bytes: &[u8; 5]) -> String {
    let bits = bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b));

    (0..SUFFIX_LEN)
        .rev()
        .map(|i| BASE32_ALPHABET[((bits >> (i * 5)) & 0x1f) as usize] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_layout() {
        let at = Utc.with_ymd_and_hms(2024, 12, 1, 23, 5, 9).unwrap();
        let code = format_barcode(7, 123, at, &[0xff; 5]);
        assert_eq!(code, "C007-S123-241201230509-77777777");
    }

    #[test]
    fn test_base32_matches_rfc4648() {
        // "hello" encodes to NBSWY3DP in standard base32
        assert_eq!(encode_base32(b"hello"), "NBSWY3DP");
    }

    #[test]
    fn test_wide_ids_are_not_truncated() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let code = format_barcode(1234, 0, at, &[0; 5]);
        assert!(code.starts_with("C1234-S000-"));
    }

    #[test]
    fn test_system_generator_shape() {
        let code = SystemBarcodeGenerator.generate(Some(4), None).unwrap();
        let parts: Vec<&str> = code.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "C004");
        assert_eq!(parts[1], "S000");
        assert_eq!(parts[2].len(), 12);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
        assert_eq!(parts[3].len(), SUFFIX_LEN);
        assert!(parts[3].bytes().all(|b| BASE32_ALPHABET.contains(&b)));
    }

    #[test]
    fn test_system_generator_varies() {
        let a = SystemBarcodeGenerator.generate(Some(1), Some(1)).unwrap();
        let b = SystemBarcodeGenerator.generate(Some(1), Some(1)).unwrap();
        // 40 random bits per call; a clash here is vanishingly unlikely.
        assert_ne!(a, b);
    }
}
