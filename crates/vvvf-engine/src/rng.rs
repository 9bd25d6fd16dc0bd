//! Deterministic RNG using PCG32 with BLAKE3 seed derivation.
//!
//! Every run owns its generator by value inside its control state, so clones
//! of the state continue the same sequence independently and renders are
//! reproducible from the seed alone.

use rand::SeedableRng;
use rand_pcg::Pcg32;

/// Creates a PCG32 RNG from a 64-bit seed.
pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Derives a seed for a named stream from the run seed.
///
/// Uses BLAKE3 over the little-endian seed followed by the UTF-8 key, so each
/// stream (for example "carrier_random") is independent of the others.
pub fn derive_stream_seed(run_seed: u64, key: &str) -> u64 {
    let mut input = Vec::with_capacity(8 + key.len());
    input.extend_from_slice(&run_seed.to_le_bytes());
    input.extend_from_slice(key.as_bytes());

    let hash = blake3::hash(&input);

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Creates the RNG for a named stream of a run.
pub fn create_stream_rng(run_seed: u64, key: &str) -> Pcg32 {
    create_rng(derive_stream_seed(run_seed, key))
}
