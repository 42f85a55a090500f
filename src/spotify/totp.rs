use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::error::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

const PERIOD_SECS: i64 = 30;
const DIGITS: u32 = 6;

/// 6-digit RFC 6238 code (HMAC-SHA1, 30 s step) for the given trusted time.
///
/// The counter is always encoded big-endian; the verifying server expects
/// RFC 4226 byte order regardless of the host.
pub fn generate(trusted_epoch_secs: i64, secret: &str) -> Result<String> {
    if trusted_epoch_secs <= 0 {
        return Err(Error::InvalidTime(trusted_epoch_secs));
    }
    let counter = (trusted_epoch_secs / PERIOD_SECS) as u64;

    // HMAC accepts keys of any length.
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| Error::MalformedSecretDocument(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let sum = mac.finalize().into_bytes();

    let offset = (sum[sum.len() - 1] & 0x0f) as usize;
    let bin = u32::from_be_bytes([
        sum[offset] & 0x7f,
        sum[offset + 1],
        sum[offset + 2],
        sum[offset + 3],
    ]);

    let code = bin % 10u32.pow(DIGITS);
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}
