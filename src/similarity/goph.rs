//! Grouped One-Permutation Hashing (GOPH) sketches and Jaccard similarity
//!
//! GOPH interpolates between One-Permutation Hashing (a single hash per
//! element) and classical k-permutation MinHash (many independent
//! permutations): each element is hashed once per *group*, using the group
//! index as the seed, giving `num_groups` quasi-independent permutations at
//! the cost of `num_groups` hash evaluations per element rather than
//! `num_hashes`.
//!
//! A sketch is a fixed-length array of fixed-width slot minima, partitioned
//! into equal-size contiguous groups. [`build_sketch`] constructs one from a
//! stream of 32-bit element hashes; [`downgrade`] narrows an existing sketch
//! to a smaller bit width; [`estimate_similarity`] compares two sketches of
//! equal length, with an optional early-terminating statistical mode for
//! large sketches.

use crate::common::hash::{murmur3_32_u32, secondary_hash};
use crate::common::validation::{validate_bit_width, validate_num_hashes_groups};
use crate::common::{Result, SketchError};

/// A Grouped One-Permutation Hashing sketch
///
/// One variant per supported slot width. Widths 2, 4, and 8 all use an
/// 8-bit backing array (values are constrained to the low 2/4/8 bits); 16
/// and 32 use their natural element types. Carrying width in the variant
/// tag, rather than a separate byte, makes [`bit_width_of`] a total,
/// infallible function and lets [`downgrade`] pattern-match the source
/// width directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GophSketch {
    /// 2-bit slots, backed by a `Vec<u8>` with values in `0..=0x3`.
    Bits2(Vec<u8>),
    /// 4-bit slots, backed by a `Vec<u8>` with values in `0..=0xF`.
    Bits4(Vec<u8>),
    /// 8-bit slots.
    Bits8(Vec<u8>),
    /// 16-bit slots.
    Bits16(Vec<u16>),
    /// 32-bit slots.
    Bits32(Vec<u32>),
}

impl GophSketch {
    /// Number of slots in the sketch.
    pub fn len(&self) -> usize {
        match self {
            GophSketch::Bits2(v) | GophSketch::Bits4(v) | GophSketch::Bits8(v) => v.len(),
            GophSketch::Bits16(v) => v.len(),
            GophSketch::Bits32(v) => v.len(),
        }
    }

    /// Whether the sketch has zero slots.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read slot `i` as a widened `u32`, regardless of backing width.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`, matching `Vec`'s own indexing contract.
    pub fn get(&self, i: usize) -> u32 {
        match self {
            GophSketch::Bits2(v) | GophSketch::Bits4(v) | GophSketch::Bits8(v) => v[i] as u32,
            GophSketch::Bits16(v) => v[i] as u32,
            GophSketch::Bits32(v) => v[i],
        }
    }
}

/// Slot bit width for a sketch, one of `{2, 4, 8, 16, 32}`.
///
/// Total and infallible: every `GophSketch` value carries its width in its
/// variant tag, so there is no "unrecognized container" failure mode to
/// surface at this boundary.
pub fn bit_width_of(sketch: &GophSketch) -> u8 {
    match sketch {
        GophSketch::Bits2(_) => 2,
        GophSketch::Bits4(_) => 4,
        GophSketch::Bits8(_) => 8,
        GophSketch::Bits16(_) => 16,
        GophSketch::Bits32(_) => 32,
    }
}

fn mask_for_width(width: u8) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

fn materialize(width: u8, values: Vec<u32>) -> GophSketch {
    match width {
        2 => GophSketch::Bits2(values.into_iter().map(|v| v as u8).collect()),
        4 => GophSketch::Bits4(values.into_iter().map(|v| v as u8).collect()),
        8 => GophSketch::Bits8(values.into_iter().map(|v| v as u8).collect()),
        16 => GophSketch::Bits16(values.into_iter().map(|v| v as u16).collect()),
        32 => GophSketch::Bits32(values),
        _ => unreachable!("bit width validated before materialize is called"),
    }
}

/// Build a GOPH sketch from a stream of 32-bit element hashes.
///
/// `num_hashes` is the total signature length N; `num_groups` partitions it
/// into `num_groups` contiguous groups of `num_hashes / num_groups` slots
/// each. Duplicate elements are harmless (they can only lower a slot's
/// running minimum, which is idempotent). An empty `elements` iterator is
/// valid and produces an all-zero sketch.
///
/// # Errors
/// Returns [`SketchError::InvalidParameter`] if `num_hashes` or `num_groups`
/// is zero, if `num_hashes` is not evenly divisible by `num_groups`, or if
/// `bit_width` is not one of `{2, 4, 8, 16, 32}`.
///
/// # Examples
/// ```
/// use goph_sketch::similarity::goph::build_sketch;
///
/// let sketch = build_sketch([1u32, 2, 3, 4, 5], 128, 4, 32).unwrap();
/// assert_eq!(sketch.len(), 128);
/// ```
pub fn build_sketch(
    elements: impl IntoIterator<Item = u32>,
    num_hashes: usize,
    num_groups: usize,
    bit_width: u8,
) -> Result<GophSketch> {
    validate_num_hashes_groups(num_hashes, num_groups)?;
    validate_bit_width(bit_width)?;

    let k_prime = num_hashes / num_groups;
    let mask = mask_for_width(bit_width);

    // Worked internally in u32 regardless of target width: the low bits
    // produced by `secondary_hash` are already well-mixed by fmix32, so
    // narrowing at the very end (materialize) is equivalent to having
    // built natively at the lower width, per the width-management
    // "mask, don't quantize" rationale.
    let mut slots = vec![0u32; num_hashes];
    let mut touched = vec![false; num_hashes];

    for element in elements {
        for group in 0..num_groups {
            let base = murmur3_32_u32(element, group as u32);
            let bin = (base as usize) % k_prime;
            let candidate = secondary_hash(base, bit_width) & mask;
            let candidate = if candidate == 0 { 1 } else { candidate };
            let slot = group * k_prime + bin;

            if !touched[slot] || candidate < slots[slot] {
                slots[slot] = candidate;
                touched[slot] = true;
            }
        }
    }

    for (slot, was_touched) in slots.iter_mut().zip(touched.iter()) {
        if !was_touched {
            *slot = 0;
        }
    }

    Ok(materialize(bit_width, slots))
}

/// [`build_sketch`] with `bit_width` defaulted to 32, mirroring the
/// specification's "Default 32" language (Rust has no default arguments).
pub fn build_sketch_default(
    elements: impl IntoIterator<Item = u32>,
    num_hashes: usize,
    num_groups: usize,
) -> Result<GophSketch> {
    build_sketch(elements, num_hashes, num_groups, 32)
}

/// Narrow a sketch to a smaller bit width.
///
/// Every nonzero slot is masked to the low `target_width` bits; a value
/// masked down to zero is promoted to 1 so it does not collide with the
/// "empty" sentinel. Zero slots stay zero.
///
/// # Errors
/// Returns [`SketchError::InvalidParameter`] if `target_width` is not one of
/// `{2, 4, 8, 16}`, or if it is not strictly smaller than the sketch's
/// current width.
pub fn downgrade(sketch: &GophSketch, target_width: u8) -> Result<GophSketch> {
    if !matches!(target_width, 2 | 4 | 8 | 16) {
        return Err(SketchError::InvalidParameter {
            param: "target_width".to_string(),
            value: target_width.to_string(),
            constraint: "must be one of {2, 4, 8, 16}".to_string(),
        });
    }

    let source_width = bit_width_of(sketch);
    if target_width >= source_width {
        return Err(SketchError::InvalidParameter {
            param: "target_width".to_string(),
            value: target_width.to_string(),
            constraint: format!("must be smaller than the source width ({})", source_width),
        });
    }

    let mask = mask_for_width(target_width);
    let len = sketch.len();
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        let v = sketch.get(i);
        values.push(if v == 0 {
            0
        } else {
            let masked = v & mask;
            if masked == 0 {
                1
            } else {
                masked
            }
        });
    }

    Ok(materialize(target_width, values))
}

/// Optional parameters for [`estimate_similarity`]'s early-termination mode.
///
/// Omit entirely (pass `None`) for simple mode. Supplying `threshold` or
/// `epsilon` requires both, plus `num_groups`. `k_max` may stand alone for
/// fast-approximation mode (process only the first `k_max` groups, no
/// statistical early exit).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EstimateOptions {
    /// Number of groups the sketches are partitioned into.
    pub num_groups: Option<usize>,
    /// Similarity threshold T for the early-termination test.
    pub threshold: Option<f64>,
    /// Tolerated probability ε of an incorrect early-exit decision.
    pub epsilon: Option<f64>,
    /// Process only the first `k_max` groups (fast-approximation mode).
    pub k_max: Option<usize>,
}

impl EstimateOptions {
    /// Options requesting statistical early termination.
    pub fn with_early_termination(num_groups: usize, threshold: f64, epsilon: f64) -> Self {
        EstimateOptions {
            num_groups: Some(num_groups),
            threshold: Some(threshold),
            epsilon: Some(epsilon),
            k_max: None,
        }
    }

    /// Options requesting fast-approximation mode over the first `k_max`
    /// groups, with no statistical early exit.
    pub fn with_k_max(num_groups: usize, k_max: usize) -> Self {
        EstimateOptions {
            num_groups: Some(num_groups),
            threshold: None,
            epsilon: None,
            k_max: Some(k_max),
        }
    }
}

const TIE_EPSILON: f64 = 1e-9;

/// Estimate the Jaccard similarity of two GOPH sketches.
///
/// With `options = None`, this scans every slot once (§4.4.1 "simple
/// mode"): `U` is the count of slots where at least one side is nonzero,
/// `M` is the count of slots where both sides agree on a nonzero value, and
/// the estimate is `M / U` (or `1.0` if `U == 0`, i.e. both sketches are
/// entirely empty).
///
/// With `options` supplying `num_groups` plus `threshold`/`epsilon`, the
/// estimator processes one group at a time and may exit early once a
/// binomial tail bound makes the outcome statistically certain; see
/// [`EstimateOptions`]. Supplying only `k_max` instead runs the cheaper
/// fast-approximation mode over a fixed prefix of groups.
///
/// # Errors
/// Returns [`SketchError::IncompatibleSketches`] if the two sketches differ
/// in length, and [`SketchError::InvalidParameter`] for malformed option
/// combinations (threshold without epsilon, groups not dividing the length,
/// `k_max` out of `[1, num_groups]`, etc).
///
/// # Examples
/// ```
/// use goph_sketch::similarity::goph::{estimate_similarity, GophSketch};
///
/// let a = GophSketch::Bits8(vec![10, 20, 30, 40]);
/// let b = GophSketch::Bits8(vec![10, 20, 50, 60]);
/// let sim = estimate_similarity(&a, &b, None).unwrap();
/// assert_eq!(sim, 0.5);
/// ```
pub fn estimate_similarity(
    a: &GophSketch,
    b: &GophSketch,
    options: Option<EstimateOptions>,
) -> Result<f64> {
    if a.len() != b.len() {
        return Err(SketchError::IncompatibleSketches {
            reason: format!(
                "sketch lengths differ: {} vs {}",
                a.len(),
                b.len()
            ),
        });
    }

    match options {
        None => Ok(simple_similarity(a, b)),
        Some(opts) => optimized_similarity(a, b, opts),
    }
}

fn simple_similarity(a: &GophSketch, b: &GophSketch) -> f64 {
    let len = a.len();
    if len == 0 {
        return 1.0;
    }

    let mut union = 0u64;
    let mut matches = 0u64;
    for i in 0..len {
        let av = a.get(i);
        let bv = b.get(i);
        if av != 0 || bv != 0 {
            union += 1;
            if av == bv && av != 0 {
                matches += 1;
            }
        }
    }

    if union == 0 {
        1.0
    } else {
        matches as f64 / union as f64
    }
}

fn optimized_similarity(a: &GophSketch, b: &GophSketch, opts: EstimateOptions) -> Result<f64> {
    let len = a.len();

    let num_groups = opts.num_groups.ok_or_else(|| SketchError::InvalidParameter {
        param: "num_groups".to_string(),
        value: "None".to_string(),
        constraint: "required whenever threshold, epsilon, or k_max is supplied".to_string(),
    })?;

    if num_groups == 0 {
        return Err(SketchError::InvalidParameter {
            param: "num_groups".to_string(),
            value: num_groups.to_string(),
            constraint: "must be greater than 0".to_string(),
        });
    }
    if len % num_groups != 0 {
        return Err(SketchError::InvalidParameter {
            param: "num_groups".to_string(),
            value: num_groups.to_string(),
            constraint: format!("sketch length ({}) must be divisible by num_groups", len),
        });
    }

    match (opts.threshold, opts.epsilon) {
        (Some(_), Some(_)) | (None, None) => {}
        _ => {
            return Err(SketchError::InvalidParameter {
                param: "threshold/epsilon".to_string(),
                value: format!("{:?}/{:?}", opts.threshold, opts.epsilon),
                constraint: "threshold and epsilon must be supplied together".to_string(),
            });
        }
    }

    if let Some(t) = opts.threshold {
        if !(0.0..=1.0).contains(&t) {
            return Err(SketchError::InvalidParameter {
                param: "threshold".to_string(),
                value: t.to_string(),
                constraint: "must be in range [0.0, 1.0]".to_string(),
            });
        }
    }
    if let Some(e) = opts.epsilon {
        if !(0.0 < e && e < 1.0) {
            return Err(SketchError::InvalidParameter {
                param: "epsilon".to_string(),
                value: e.to_string(),
                constraint: "must be in range (0.0, 1.0) (exclusive)".to_string(),
            });
        }
    }

    let k_prime = len / num_groups;
    let g_eff = match opts.k_max {
        Some(k_max) => {
            if k_max == 0 || k_max > num_groups {
                return Err(SketchError::InvalidParameter {
                    param: "k_max".to_string(),
                    value: k_max.to_string(),
                    constraint: format!("must be in range [1, {}]", num_groups),
                });
            }
            k_max
        }
        None => num_groups,
    };

    let early_termination = opts.threshold.is_some() && opts.epsilon.is_some();
    let threshold = opts.threshold.unwrap_or(0.0);
    let epsilon = opts.epsilon.unwrap_or(0.0);

    let mut union_count = 0u64;
    let mut match_count = 0u64;
    let mut processed_slots = 0usize;

    for group in 0..g_eff {
        let start = group * k_prime;
        let end = start + k_prime;
        for i in start..end {
            let av = a.get(i);
            let bv = b.get(i);
            if av != 0 || bv != 0 {
                union_count += 1;
                if av == bv && av != 0 {
                    match_count += 1;
                }
            }
        }
        processed_slots += k_prime;

        if group == g_eff - 1 {
            break;
        }
        if !early_termination {
            continue;
        }

        let ma = k_prime as f64 * threshold;
        let remaining = (g_eff - (group + 1)) as f64;
        let mra = (g_eff as f64 * ma - match_count as f64) / remaining;

        if mra < ma {
            let k = ((mra - TIE_EPSILON).floor()) as i64;
            let q = binomial_cdf_le(k, k_prime, threshold);
            if q <= epsilon {
                let scale = len as f64 / processed_slots as f64;
                let full_union = union_count as f64 * scale;
                let full_match = match_count as f64 * scale;
                return Ok(if full_union == 0.0 {
                    1.0
                } else {
                    full_match / full_union
                });
            }
        } else {
            let k = ((mra - TIE_EPSILON).ceil()) as i64;
            let q = binomial_cdf_ge(k, k_prime, threshold);
            if q <= epsilon {
                return Ok(0.0);
            }
        }
    }

    if union_count == 0 {
        Ok(1.0)
    } else {
        Ok(match_count as f64 / union_count as f64)
    }
}

/// P(X ≤ k) for X ~ Binomial(n, p), saturated to `[0.0, 1.0]`.
fn binomial_cdf_le(k: i64, n: usize, p: f64) -> f64 {
    if k < 0 {
        return 0.0;
    }
    if k as u64 >= n as u64 {
        return 1.0;
    }

    let use_normal = n > 30 && (n as f64 * p) >= 5.0 && (n as f64 * (1.0 - p)) >= 5.0;
    if use_normal {
        normal_cdf_le(k as f64, n, p)
    } else {
        exact_binomial_cdf_le(k as u64, n, p)
    }
}

/// P(X ≥ k) for X ~ Binomial(n, p), via the complement of [`binomial_cdf_le`].
fn binomial_cdf_ge(k: i64, n: usize, p: f64) -> f64 {
    if k <= 0 {
        return 1.0;
    }
    (1.0 - binomial_cdf_le(k - 1, n, p)).clamp(0.0, 1.0)
}

/// Exact binomial CDF via the PMF recurrence, for small `n`.
fn exact_binomial_cdf_le(k: u64, n: usize, p: f64) -> f64 {
    let n = n as f64;

    if p <= 0.0 {
        return 1.0;
    }
    if p >= 1.0 {
        return 0.0;
    }

    let ratio = p / (1.0 - p);
    let mut pmf = (1.0 - p).powf(n);
    let mut cdf = pmf;

    let mut i = 1u64;
    while i <= k {
        pmf *= (n - i as f64 + 1.0) / i as f64 * ratio;
        cdf += pmf;
        i += 1;
    }

    cdf.clamp(0.0, 1.0)
}

/// Normal approximation (with continuity correction) to P(X ≤ k) for large
/// `n`.
fn normal_cdf_le(k: f64, n: usize, p: f64) -> f64 {
    let n = n as f64;
    let mean = n * p;
    let variance = n * p * (1.0 - p);
    let stddev = variance.sqrt();
    let z = (k + 0.5 - mean) / stddev;
    standard_normal_cdf(z).clamp(0.0, 1.0)
}

fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

/// Abramowitz & Stegun formula 7.1.26 rational approximation to `erf`.
///
/// The crate has no dependency that already exposes `erf`; this keeps the
/// normal-approximation branch of the Jaccard estimator self-contained
/// rather than pulling in a numerics crate for one function.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();

    sign * y
}
