//! Polynomial arithmetic over GF(256).
//!
//! Coefficient order: index 0 is the constant term. Polynomials are kept
//! normalized — the leading coefficient is non-zero, and the zero polynomial
//! is a single zero coefficient.

use rayon::prelude::*;

use crate::gf256::{gf_add, gf_mul};

/// Multi-point evaluation switches to rayon at this many points. Results are
/// concatenated in input order either way.
const PAR_EVAL_THRESHOLD: usize = 64;

/// A polynomial over GF(256).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GfPoly {
    coeffs: Vec<u8>,
}

impl GfPoly {
    /// Build from coefficients (constant term first), trimming leading zeros.
    pub fn new(coeffs: Vec<u8>) -> Self {
        let mut poly = GfPoly { coeffs };
        poly.normalize();
        poly
    }

    pub fn zero() -> Self {
        GfPoly { coeffs: vec![0] }
    }

    pub fn one() -> Self {
        GfPoly { coeffs: vec![1] }
    }

    /// `coeff · x^degree`.
    pub fn monomial(degree: usize, coeff: u8) -> Self {
        if coeff == 0 {
            return GfPoly::zero();
        }
        let mut coeffs = vec![0u8; degree + 1];
        coeffs[degree] = coeff;
        GfPoly { coeffs }
    }

    fn normalize(&mut self) {
        while self.coeffs.len() > 1 && *self.coeffs.last().expect("non-empty") == 0 {
            self.coeffs.pop();
        }
        if self.coeffs.is_empty() {
            self.coeffs.push(0);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.coeffs == [0]
    }

    /// Degree; the zero polynomial reports 0.
    pub fn degree(&self) -> usize {
        self.coeffs.len() - 1
    }

    /// Coefficient of x^i (0 beyond the stored degree).
    pub fn coeff(&self, i: usize) -> u8 {
        self.coeffs.get(i).copied().unwrap_or(0)
    }

    pub fn coeffs(&self) -> &[u8] {
        &self.coeffs
    }

    pub fn add(&self, other: &GfPoly) -> GfPoly {
        let len = self.coeffs.len().max(other.coeffs.len());
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(gf_add(self.coeff(i), other.coeff(i)));
        }
        GfPoly::new(out)
    }

    pub fn mul(&self, other: &GfPoly) -> GfPoly {
        if self.is_zero() || other.is_zero() {
            return GfPoly::zero();
        }
        let mut out = vec![0u8; self.coeffs.len() + other.coeffs.len() - 1];
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in other.coeffs.iter().enumerate() {
                out[i + j] ^= gf_mul(a, b);
            }
        }
        GfPoly::new(out)
    }

    /// Multiply every coefficient by `k`.
    pub fn scale(&self, k: u8) -> GfPoly {
        GfPoly::new(self.coeffs.iter().map(|&c| gf_mul(c, k)).collect())
    }

    /// Multiply by x^n.
    pub fn shift(&self, n: usize) -> GfPoly {
        if self.is_zero() {
            return GfPoly::zero();
        }
        let mut coeffs = vec![0u8; n];
        coeffs.extend_from_slice(&self.coeffs);
        GfPoly { coeffs }
    }

    /// Horner evaluation at `x`.
    pub fn eval(&self, x: u8) -> u8 {
        let mut acc = 0u8;
        for &c in self.coeffs.iter().rev() {
            acc = gf_add(gf_mul(acc, x), c);
        }
        acc
    }

    /// Evaluate at many points, preserving order. Large point sets are split
    /// across the rayon pool; the result is deterministic regardless.
    pub fn eval_multi(&self, points: &[u8]) -> Vec<u8> {
        if points.len() < PAR_EVAL_THRESHOLD {
            points.iter().map(|&x| self.eval(x)).collect()
        } else {
            points.par_iter().map(|&x| self.eval(x)).collect()
        }
    }

    /// Polynomial long division: returns (quotient, remainder).
    ///
    /// Dividing by the zero polynomial is a programming error.
    pub fn divide(&self, divisor: &GfPoly) -> (GfPoly, GfPoly) {
        assert!(!divisor.is_zero(), "division by the zero polynomial");
        if self.degree() < divisor.degree() || self.is_zero() {
            return (GfPoly::zero(), self.clone());
        }

        let mut rem = self.coeffs.clone();
        let dlead = *divisor.coeffs.last().expect("non-empty");
        let dlen = divisor.coeffs.len();
        let mut quot = vec![0u8; rem.len() - dlen + 1];

        for i in (0..quot.len()).rev() {
            let lead = rem[i + dlen - 1];
            if lead == 0 {
                continue;
            }
            let q = crate::gf256::gf_div(lead, dlead);
            quot[i] = q;
            for (j, &d) in divisor.coeffs.iter().enumerate() {
                rem[i + j] ^= gf_mul(q, d);
            }
        }

        (GfPoly::new(quot), GfPoly::new(rem))
    }

    /// Formal derivative. In characteristic 2 only odd-power terms survive.
    pub fn derivative(&self) -> GfPoly {
        if self.degree() == 0 {
            return GfPoly::zero();
        }
        let mut out = vec![0u8; self.degree()];
        for (i, slot) in out.iter_mut().enumerate() {
            if i % 2 == 0 {
                *slot = self.coeff(i + 1);
            }
        }
        GfPoly::new(out)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
