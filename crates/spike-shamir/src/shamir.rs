// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Threshold splitting and reconstruction of the root key.
//!
//! The root key is a canonical scalar of the prime-order Ed25519 group. A
//! split draws a random polynomial `f` of degree `t - 1` with `f(0)` equal to
//! the key and hands out `f(1) ..= f(n)`. Any `t` points rebuild `f(0)` by
//! Lagrange interpolation; fewer reveal nothing.
//!
//! Every function here is pure and CPU-bound. Polynomial coefficients and
//! intermediate scalars are zeroed before returning.

use std::collections::HashSet;

use curve25519_dalek::scalar::Scalar;
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use ring::hkdf;
use spike_core::{RootKey, Shard, SpikeError, SCALAR_LEN};
use tracing::{debug, error};
use zeroize::{Zeroize, Zeroizing};

/// Smallest threshold that still splits trust between operators.
pub const MIN_THRESHOLD: usize = 2;

const SEED_SALT: &[u8] = b"spike/shamir/polynomial/v1";
const SEED_INFO: &[&[u8]] = &[b"shard-polynomial"];

/// Generate a fresh root key as a uniformly random non-zero scalar.
pub fn generate_root_key<R: RngCore + CryptoRng>(rng: &mut R) -> RootKey {
    loop {
        let scalar = Scalar::random(rng);
        if scalar != Scalar::ZERO {
            let mut bytes = scalar.to_bytes();
            return RootKey::from_bytes(&mut bytes);
        }
    }
}

/// Split `secret` into `n` shards, any `t` of which reconstruct it.
///
/// The result is verified by reconstructing from `t`-sized subsets before it
/// is returned; a mismatch aborts with [`SpikeError::Integrity`] and no shard
/// leaves this function.
pub fn split<R: RngCore + CryptoRng>(
    secret: &RootKey,
    n: usize,
    t: usize,
    rng: &mut R,
) -> Result<Vec<Shard>, SpikeError> {
    check_parameters(n, t)?;
    let constant = Zeroizing::new(scalar_from_secret(secret)?);

    let mut coefficients: Zeroizing<Vec<Scalar>> = Zeroizing::new(Vec::with_capacity(t));
    coefficients.push(*constant);
    for _ in 1..t {
        coefficients.push(Scalar::random(rng));
    }

    let shards: Vec<Shard> = (1..=n as u64)
        .map(|index| {
            let mut y = evaluate(&coefficients, Scalar::from(index));
            let shard = Shard::new(index, y.to_bytes());
            y.zeroize();
            shard
        })
        .collect();

    verify_split(secret, &shards, t)?;
    debug!(shares = n, threshold = t, "root key split");
    Ok(shards)
}

/// Split with a polynomial seeded from the secret itself.
///
/// The same key always yields the same shards, so an instance that rebuilt
/// its key through restore hands out shards identical to those issued at
/// bootstrap.
pub fn split_deterministic(secret: &RootKey, n: usize, t: usize) -> Result<Vec<Shard>, SpikeError> {
    let mut seed = derive_seed(secret)?;
    let mut rng = StdRng::from_seed(seed);
    seed.zeroize();
    split(secret, n, t, &mut rng)
}

/// Reconstruct the secret from at least `t` shards.
///
/// Fails closed: fewer than `t` shards or any duplicate index is a
/// [`SpikeError::Quorum`]; a zero-valued shard, a shard that disagrees with
/// the others, or a zero result is a [`SpikeError::Integrity`].
pub fn reconstruct(shards: &[Shard], t: usize) -> Result<RootKey, SpikeError> {
    if t < MIN_THRESHOLD {
        return Err(SpikeError::Input(format!(
            "threshold must be at least {MIN_THRESHOLD}, got {t}"
        )));
    }

    let distinct: HashSet<u64> = shards.iter().map(Shard::index).collect();
    if distinct.len() != shards.len() || shards.len() < t {
        return Err(SpikeError::Quorum {
            collected: distinct.len(),
            required: t,
        });
    }
    for shard in shards {
        check_shard(shard)?;
    }

    let xs: Vec<Scalar> = shards.iter().map(|s| Scalar::from(s.index())).collect();
    let ys: Zeroizing<Vec<Scalar>> = Zeroizing::new(
        shards
            .iter()
            .map(scalar_from_shard)
            .collect::<Result<Vec<_>, SpikeError>>()?,
    );

    for k in t..shards.len() {
        let mut expected = interpolate(&xs[..t], &ys[..t], xs[k]);
        let consistent = expected == ys[k];
        expected.zeroize();
        if !consistent {
            return Err(SpikeError::Integrity(
                "shard set is inconsistent: at least one shard was altered".to_string(),
            ));
        }
    }

    let mut secret = interpolate(&xs[..t], &ys[..t], Scalar::ZERO);
    if secret == Scalar::ZERO {
        return Err(SpikeError::Integrity(
            "reconstruction produced the zero key".to_string(),
        ));
    }
    let mut bytes = secret.to_bytes();
    secret.zeroize();
    Ok(RootKey::from_bytes(&mut bytes))
}

/// Validate a single shard before it is accepted for reconstruction.
///
/// Index 0 is the secret's own position and never a valid shard; the value
/// must be a non-zero canonical scalar.
pub fn check_shard(shard: &Shard) -> Result<(), SpikeError> {
    if shard.index() == 0 {
        return Err(SpikeError::Input(
            "shard index 0 is reserved and cannot be submitted".to_string(),
        ));
    }
    if shard.is_zero() {
        return Err(SpikeError::Integrity(format!(
            "shard {} has an all-zero value",
            shard.index()
        )));
    }
    let mut scalar = scalar_from_shard(shard)?;
    scalar.zeroize();
    Ok(())
}

/// Reconstruct from the first and last `t`-sized windows and compare each
/// against the original bit-for-bit.
fn verify_split(secret: &RootKey, shards: &[Shard], t: usize) -> Result<(), SpikeError> {
    let windows = [&shards[..t], &shards[shards.len() - t..]];
    for window in windows {
        let matches = match reconstruct(window, t) {
            Ok(rebuilt) => rebuilt.expose() == secret.expose(),
            Err(_) => false,
        };
        if !matches {
            error!("split self-check failed; discarding shards");
            return Err(SpikeError::Integrity(
                "split self-check failed: shards do not reconstruct the secret".to_string(),
            ));
        }
    }
    Ok(())
}

fn check_parameters(n: usize, t: usize) -> Result<(), SpikeError> {
    if t < MIN_THRESHOLD || t > n {
        return Err(SpikeError::Input(format!(
            "invalid sharing parameters: need {MIN_THRESHOLD} <= threshold <= shares, got threshold={t} shares={n}"
        )));
    }
    Ok(())
}

fn scalar_from_secret(secret: &RootKey) -> Result<Scalar, SpikeError> {
    let scalar: Option<Scalar> = Scalar::from_canonical_bytes(*secret.expose()).into();
    match scalar {
        Some(s) if s != Scalar::ZERO => Ok(s),
        _ => Err(SpikeError::Integrity(
            "root key is not a non-zero canonical scalar".to_string(),
        )),
    }
}

fn scalar_from_shard(shard: &Shard) -> Result<Scalar, SpikeError> {
    let mut bytes: [u8; SCALAR_LEN] = *shard.value();
    let scalar: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
    bytes.zeroize();
    scalar.ok_or_else(|| {
        SpikeError::Input(format!(
            "shard {} value is not a canonical scalar",
            shard.index()
        ))
    })
}

/// Horner evaluation; `coefficients[0]` is the constant term.
fn evaluate(coefficients: &[Scalar], x: Scalar) -> Scalar {
    coefficients
        .iter()
        .rev()
        .fold(Scalar::ZERO, |acc, c| acc * x + c)
}

/// Lagrange interpolation through `(xs[i], ys[i])` evaluated at `z`.
///
/// Callers guarantee pairwise-distinct x coordinates.
fn interpolate(xs: &[Scalar], ys: &[Scalar], z: Scalar) -> Scalar {
    let mut result = Scalar::ZERO;
    for (i, (xi, yi)) in xs.iter().zip(ys).enumerate() {
        let mut numerator = Scalar::ONE;
        let mut denominator = Scalar::ONE;
        for (j, xj) in xs.iter().enumerate() {
            if i != j {
                numerator *= z - xj;
                denominator *= xi - xj;
            }
        }
        result += yi * numerator * denominator.invert();
    }
    result
}

fn derive_seed(secret: &RootKey) -> Result<[u8; 32], SpikeError> {
    let salt = hkdf::Salt::new(hkdf::HKDF_SHA256, SEED_SALT);
    let prk = salt.extract(secret.expose());
    let okm = prk
        .expand(SEED_INFO, hkdf::HKDF_SHA256)
        .map_err(|_| SpikeError::Crypto("HKDF expand failed".to_string()))?;
    let mut seed = [0u8; 32];
    okm.fill(&mut seed)
        .map_err(|_| SpikeError::Crypto("HKDF fill failed".to_string()))?;
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(0x5eed)
    }

    /// All `k`-element index combinations of `0..n`.
    fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
        if k == 0 {
            return vec![vec![]];
        }
        if n < k {
            return vec![];
        }
        let mut with_last = combinations(n - 1, k - 1);
        for combo in &mut with_last {
            combo.push(n - 1);
        }
        let mut out = combinations(n - 1, k);
        out.extend(with_last);
        out
    }

    #[test]
    fn every_threshold_subset_reconstructs() {
        let mut rng = test_rng();
        for n in 2..=6 {
            for t in 2..=n {
                let secret = generate_root_key(&mut rng);
                let shards = split(&secret, n, t, &mut rng).unwrap();
                assert_eq!(shards.len(), n);
                for combo in combinations(n, t) {
                    let subset: Vec<Shard> = combo.iter().map(|&i| shards[i].clone()).collect();
                    let rebuilt = reconstruct(&subset, t).unwrap();
                    assert_eq!(rebuilt.expose(), secret.expose(), "n={n} t={t} subset={combo:?}");
                }
            }
        }
    }

    #[test]
    fn shard_indices_are_one_based_and_distinct() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let shards = split(&secret, 5, 3, &mut rng).unwrap();
        let indices: Vec<u64> = shards.iter().map(Shard::index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn fewer_than_threshold_fails_with_quorum_error() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let shards = split(&secret, 5, 3, &mut rng).unwrap();
        let err = reconstruct(&shards[..2], 3).unwrap_err();
        assert!(matches!(err, SpikeError::Quorum { collected: 2, required: 3 }));
    }

    #[test]
    fn duplicate_indices_fail_with_quorum_error() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let shards = split(&secret, 5, 3, &mut rng).unwrap();
        let dup = vec![shards[0].clone(), shards[0].clone(), shards[1].clone(), shards[2].clone()];
        let err = reconstruct(&dup, 3).unwrap_err();
        assert!(matches!(err, SpikeError::Quorum { collected: 3, required: 3 }));
    }

    #[test]
    fn tampered_shard_is_detected_when_extra_shards_are_present() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let mut shards = split(&secret, 5, 3, &mut rng).unwrap();

        let mut value = *shards[4].value();
        value[0] ^= 0x01;
        shards[4] = Shard::new(5, value);

        let err = reconstruct(&shards, 3).unwrap_err();
        assert!(matches!(err, SpikeError::Integrity(_)));
    }

    #[test]
    fn tampered_shard_fails_self_check() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let mut shards = split(&secret, 3, 2, &mut rng).unwrap();

        let mut value = *shards[0].value();
        value[3] ^= 0x40;
        shards[0] = Shard::new(1, value);

        let err = verify_split(&secret, &shards, 2).unwrap_err();
        assert!(matches!(err, SpikeError::Integrity(_)));
    }

    #[test]
    fn zero_shard_is_an_integrity_error() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let mut shards = split(&secret, 3, 2, &mut rng).unwrap();
        shards[1] = Shard::new(2, [0u8; SCALAR_LEN]);
        let err = reconstruct(&shards[..2], 2).unwrap_err();
        assert!(matches!(err, SpikeError::Integrity(_)));
    }

    #[test]
    fn non_canonical_value_is_an_input_error() {
        let shard = Shard::new(1, [0xFF; SCALAR_LEN]);
        assert!(matches!(check_shard(&shard), Err(SpikeError::Input(_))));
    }

    #[test]
    fn index_zero_is_rejected() {
        let mut value = [0u8; SCALAR_LEN];
        value[0] = 9;
        let err = check_shard(&Shard::new(0, value)).unwrap_err();
        assert!(matches!(err, SpikeError::Input(_)));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        assert!(split(&secret, 3, 1, &mut rng).is_err());
        assert!(split(&secret, 2, 3, &mut rng).is_err());
        assert!(split(&secret, 2, 2, &mut rng).is_ok());
    }

    #[test]
    fn deterministic_split_is_stable() {
        let mut rng = test_rng();
        let secret = generate_root_key(&mut rng);
        let a = split_deterministic(&secret, 5, 3).unwrap();
        let b = split_deterministic(&secret, 5, 3).unwrap();
        assert_eq!(a, b);

        let rebuilt = reconstruct(&a[2..], 3).unwrap();
        let c = split_deterministic(&rebuilt, 5, 3).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn non_canonical_root_key_cannot_be_split() {
        let mut rng = test_rng();
        let mut bytes = [0xFF; SCALAR_LEN];
        let secret = RootKey::from_bytes(&mut bytes);
        let err = split(&secret, 3, 2, &mut rng).unwrap_err();
        assert!(matches!(err, SpikeError::Integrity(_)));
    }
}
