//! Random identifier generation.
//!
//! Record ids and collision suffixes are drawn from the 36-symbol
//! `[0-9a-z]` alphabet. The generator is seeded from the operating system
//! when it can be; otherwise it falls back to a time-seeded PRNG.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::{OsRng, SmallRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};
use tracing::warn;

/// Symbols used for ids and suffixes.
pub const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of a freshly created record id.
pub const ID_LEN: usize = 10;

/// Length of the suffix appended to a colliding id.
pub const SUFFIX_LEN: usize = 4;

/// Build a random number generator, preferring a CSPRNG seeded by the OS.
fn entropy_rng() -> Box<dyn RngCore> {
    match StdRng::from_rng(OsRng) {
        Ok(rng) => Box::new(rng),
        Err(err) => {
            warn!("OS entropy unavailable ({err}), using time-seeded generator");
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_nanos());
            #[allow(clippy::cast_possible_truncation)]
            let seed = (nanos as u64) ^ ((nanos >> 64) as u64);
            Box::new(SmallRng::seed_from_u64(seed))
        }
    }
}

/// Generate `len` random characters from [`ALPHABET`].
#[must_use]
pub fn random_string(len: usize) -> String {
    let mut rng = entropy_rng();
    (0..len)
        .map(|_| char::from(ALPHABET[rng.gen_range(0..ALPHABET.len())]))
        .collect()
}

/// Generate a new record id.
#[must_use]
pub fn new_record_id() -> String {
    random_string(ID_LEN)
}

/// Generate a suffix used to disambiguate a colliding id.
#[must_use]
pub fn collision_suffix() -> String {
    random_string(SUFFIX_LEN)
}
