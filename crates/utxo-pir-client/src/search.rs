//! Interpolation search over a sorted index reachable one probe at a time
//!
//! Each probe is a full PIR round trip, so the search estimates the probe
//! position from the 4-byte big-endian prefix of the key instead of always
//! bisecting. Keys are near-uniform script hashes, which keeps the expected
//! probe count well below `log2(n)`.
//!
//! The number of probes depends on where the key sits and is visible to the
//! server. It is not padded to a constant.

use std::cmp::Ordering;
use std::future::Future;

use utxo_pir_core::hint_of;

/// Result of one search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Matching position, `None` when the key is absent
    pub position: Option<u64>,
    pub probes: u32,
}

/// Interpolated probe position, rounded half up
///
/// Requires `imin <= imax` and `left <= my <= right`; the result lies in
/// `[imin, imax]`.
fn interpolate(imin: i64, imax: i64, my: u64, left: u64, right: u64) -> i64 {
    if right == left {
        return imin;
    }
    let span = (imax - imin) as u128;
    let num = span * u128::from(my - left);
    let den = u128::from(right - left);
    imin + ((2 * num + den) / (2 * den)) as i64
}

/// Find `key` among `element_count` sorted values
///
/// `probe(i)` returns the plaintext stored at position `i`; only its first
/// `key.len()` bytes take part in the comparison. Any probe error aborts the
/// search.
pub async fn interpolation_search<F, Fut, E>(
    element_count: u64,
    key: &[u8],
    mut probe: F,
) -> Result<SearchOutcome, E>
where
    F: FnMut(u64) -> Fut,
    Fut: Future<Output = Result<Vec<u8>, E>>,
{
    let my = u64::from(hint_of(key));
    let mut imin: i64 = 0;
    let mut imax: i64 = element_count as i64 - 1;
    let mut left: u64 = 0;
    let mut right: u64 = u64::from(u32::MAX);
    let mut probes = 0u32;

    while imin <= imax {
        left = left.min(my);
        right = right.max(my);
        let imid = interpolate(imin, imax, my, left, right);

        let mut value = probe(imid as u64).await?;
        probes += 1;
        value.truncate(key.len());

        match key.cmp(value.as_slice()) {
            Ordering::Less => {
                imax = imid - 1;
                right = u64::from(hint_of(&value));
            }
            Ordering::Greater => {
                imin = imid + 1;
                left = u64::from(hint_of(&value));
            }
            Ordering::Equal => {
                return Ok(SearchOutcome {
                    position: Some(imid as u64),
                    probes,
                });
            }
        }
    }

    Ok(SearchOutcome {
        position: None,
        probes,
    })
}
