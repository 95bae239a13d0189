//! Identifier generation helpers.

use bech32::Bech32m;
use chrono::Utc;
use uuid7::uuid7;

/// Construct a unique, time-ordered id then encode using bech32.
/// Used for internal shipment/document/user identifiers.
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Human-facing shipment code: `SHP-<YYYYMMDD>-<5 digits>`.
///
/// The digits come from the random tail of a fresh uuid7, so collisions
/// within a day are possible and the caller must enforce uniqueness
/// against the code index.
pub fn new_shipment_code() -> String {
    let date = Utc::now().format("%Y%m%d");
    let id = uuid7();
    let tail = id.as_bytes();
    let suffix = u32::from_be_bytes([tail[12], tail[13], tail[14], tail[15]]) % 100_000;
    format!("SHP-{date}-{suffix:05}")
}
