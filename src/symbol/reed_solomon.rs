/// Reed-Solomon coding over GF(256) with primitive polynomial 0x11D
///
/// Codewords are ordered highest degree first, as they appear in a symbol.
/// The generator's roots are alpha^0 .. alpha^(n-1).
use crate::error::SymbolError;

const PRIMITIVE: u16 = 0x11D;

const fn build_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= PRIMITIVE;
        }
        i += 1;
    }
    while i < 512 {
        exp[i] = exp[i - 255];
        i += 1;
    }
    (exp, log)
}

const TABLES: ([u8; 512], [u8; 256]) = build_tables();
static EXP: [u8; 512] = TABLES.0;
static LOG: [u8; 256] = TABLES.1;

/// Field arithmetic
pub struct Gf256;

impl Gf256 {
    /// alpha^power
    pub fn exp(power: usize) -> u8 {
        EXP[power % 255]
    }

    /// Product of two elements
    pub fn mul(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        EXP[LOG[a as usize] as usize + LOG[b as usize] as usize]
    }

    /// Quotient; `b` must be non-zero
    pub fn div(a: u8, b: u8) -> u8 {
        if a == 0 || b == 0 {
            return 0;
        }
        EXP[(LOG[a as usize] as usize + 255 - LOG[b as usize] as usize) % 255]
    }

    /// Multiplicative inverse of a non-zero element
    pub fn inv(a: u8) -> u8 {
        Self::div(1, a)
    }

    /// a^n
    pub fn pow(a: u8, n: usize) -> u8 {
        if n == 0 {
            return 1;
        }
        if a == 0 {
            return 0;
        }
        EXP[(LOG[a as usize] as usize * n) % 255]
    }
}

/// Evaluate a polynomial stored highest degree first
fn eval_high_first(poly: &[u8], x: u8) -> u8 {
    poly.iter().fold(0, |acc, &c| Gf256::mul(acc, x) ^ c)
}

/// Evaluate a polynomial stored lowest degree first
fn eval_low_first(poly: &[u8], x: u8) -> u8 {
    poly.iter().rev().fold(0, |acc, &c| Gf256::mul(acc, x) ^ c)
}

/// Generator polynomial of degree `n`, highest degree first
fn generator(n: usize) -> Vec<u8> {
    let mut g = vec![1u8];
    for i in 0..n {
        let root = Gf256::exp(i);
        let mut next = vec![0u8; g.len() + 1];
        for (j, &c) in g.iter().enumerate() {
            next[j] ^= c;
            next[j + 1] ^= Gf256::mul(c, root);
        }
        g = next;
    }
    g
}

/// Error correction codewords for a data block
pub fn encode(data: &[u8], ec_len: usize) -> Vec<u8> {
    let g = generator(ec_len);
    let mut remainder = vec![0u8; data.len() + ec_len];
    remainder[..data.len()].copy_from_slice(data);

    for i in 0..data.len() {
        let coef = remainder[i];
        if coef != 0 {
            for (j, &gj) in g.iter().enumerate().skip(1) {
                remainder[i + j] ^= Gf256::mul(gj, coef);
            }
        }
    }
    remainder.split_off(data.len())
}

fn syndromes(codewords: &[u8], ec_len: usize) -> Vec<u8> {
    (0..ec_len)
        .map(|j| eval_high_first(codewords, Gf256::exp(j)))
        .collect()
}

/// Error locator polynomial (lowest degree first) and its degree
fn berlekamp_massey(syndromes: &[u8]) -> (Vec<u8>, usize) {
    let mut locator = vec![1u8];
    let mut previous = vec![1u8];
    let mut degree = 0usize;
    let mut shift = 1usize;
    let mut last_discrepancy = 1u8;

    for i in 0..syndromes.len() {
        let mut discrepancy = syndromes[i];
        for j in 1..=degree.min(locator.len() - 1) {
            discrepancy ^= Gf256::mul(locator[j], syndromes[i - j]);
        }
        if discrepancy == 0 {
            shift += 1;
            continue;
        }

        let coef = Gf256::div(discrepancy, last_discrepancy);
        let snapshot = locator.clone();
        if locator.len() < previous.len() + shift {
            locator.resize(previous.len() + shift, 0);
        }
        for (j, &p) in previous.iter().enumerate() {
            locator[j + shift] ^= Gf256::mul(coef, p);
        }

        if 2 * degree <= i {
            degree = i + 1 - degree;
            previous = snapshot;
            last_discrepancy = discrepancy;
            shift = 1;
        } else {
            shift += 1;
        }
    }

    locator.resize(degree + 1, 0);
    (locator, degree)
}

/// Correct `codewords` (data followed by `ec_len` check codewords) in place
///
/// Returns the number of corrected codewords.
pub fn correct(codewords: &mut [u8], ec_len: usize) -> Result<usize, SymbolError> {
    let syndromes = syndromes(codewords, ec_len);
    if syndromes.iter().all(|&s| s == 0) {
        return Ok(0);
    }

    let (locator, errors) = berlekamp_massey(&syndromes);
    if errors == 0 || 2 * errors > ec_len {
        return Err(SymbolError::TooManyErrors);
    }

    // Chien search: power p is an error location when locator(alpha^-p) == 0
    let len = codewords.len();
    let powers: Vec<usize> = (0..len)
        .filter(|&p| eval_low_first(&locator, Gf256::inv(Gf256::exp(p))) == 0)
        .collect();
    if powers.len() != errors {
        return Err(SymbolError::TooManyErrors);
    }

    // Forney: e = X * omega(X^-1) / locator'(X^-1)
    let mut omega = vec![0u8; ec_len];
    for (i, slot) in omega.iter_mut().enumerate() {
        for (j, &l) in locator.iter().enumerate().take(i + 1) {
            *slot ^= Gf256::mul(l, syndromes[i - j]);
        }
    }

    for &p in &powers {
        let x = Gf256::exp(p);
        let x_inv = Gf256::inv(x);
        let numerator = eval_low_first(&omega, x_inv);
        let denominator = locator
            .iter()
            .enumerate()
            .skip(1)
            .step_by(2)
            .fold(0u8, |acc, (j, &l)| acc ^ Gf256::mul(l, Gf256::pow(x_inv, j - 1)));
        if denominator == 0 {
            return Err(SymbolError::TooManyErrors);
        }
        codewords[len - 1 - p] ^= Gf256::mul(x, Gf256::div(numerator, denominator));
    }

    if syndromes_clear(codewords, ec_len) {
        Ok(errors)
    } else {
        Err(SymbolError::TooManyErrors)
    }
}

fn syndromes_clear(codewords: &[u8], ec_len: usize) -> bool {
    syndromes(codewords, ec_len).iter().all(|&s| s == 0)
}
