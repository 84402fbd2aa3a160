//! GF(256) arithmetic over the CCSDS polynomial x^8+x^7+x^2+x+1 (0x187).
//!
//! Elements are bytes; the primitive element is α = 2. Log/exp tables are
//! built at compile time; the exp table is doubled so a log-sum lookup never
//! needs a modular reduction.
//!
//! `log[0]` is undefined. Multiplication and division screen zero operands
//! before touching the tables; `gf_inv(0)` and `gf_div(_, 0)` are programming
//! errors and panic.

const FIELD_POLY: u16 = 0x187;

/// Number of non-zero field elements; also the order of α.
pub const FIELD_ORDER: usize = 255;

// ---------------------------------------------------------------------------
// Log/exp tables (compile-time)
// ---------------------------------------------------------------------------

const fn build_tables() -> ([u8; 512], [u8; 256]) {
    let mut exp = [0u8; 512];
    let mut log = [0u8; 256];
    let mut x: u16 = 1;
    let mut i = 0;
    while i < 255 {
        exp[i] = x as u8;
        exp[i + 255] = x as u8;
        log[x as usize] = i as u8;
        x <<= 1;
        if x & 0x100 != 0 {
            x ^= FIELD_POLY;
        }
        i += 1;
    }
    (exp, log)
}

static TABLES: ([u8; 512], [u8; 256]) = build_tables();

#[inline(always)]
fn exp_table() -> &'static [u8; 512] {
    &TABLES.0
}

#[inline(always)]
fn log_table() -> &'static [u8; 256] {
    &TABLES.1
}

// ---------------------------------------------------------------------------
// Field operations
// ---------------------------------------------------------------------------

/// Addition in characteristic 2 (same as subtraction).
#[inline(always)]
pub fn gf_add(a: u8, b: u8) -> u8 {
    a ^ b
}

/// Field multiplication via log/exp lookup.
#[inline(always)]
pub fn gf_mul(a: u8, b: u8) -> u8 {
    if a == 0 || b == 0 {
        return 0;
    }
    let log = log_table();
    exp_table()[log[a as usize] as usize + log[b as usize] as usize]
}

/// Multiplicative inverse. Panics on zero.
#[inline(always)]
pub fn gf_inv(a: u8) -> u8 {
    assert!(a != 0, "inverse of 0 is undefined in GF(256)");
    exp_table()[FIELD_ORDER - log_table()[a as usize] as usize]
}

/// Field division. Panics when `b` is zero.
#[inline(always)]
pub fn gf_div(a: u8, b: u8) -> u8 {
    assert!(b != 0, "division by 0 in GF(256)");
    if a == 0 {
        return 0;
    }
    let log = log_table();
    let diff =
        FIELD_ORDER + log[a as usize] as usize - log[b as usize] as usize;
    exp_table()[diff % FIELD_ORDER]
}

/// `a` raised to a non-negative integer power.
pub fn gf_pow(a: u8, n: usize) -> u8 {
    if a == 0 {
        return if n == 0 { 1 } else { 0 };
    }
    let log_a = log_table()[a as usize] as usize;
    exp_table()[(log_a * (n % FIELD_ORDER)) % FIELD_ORDER]
}

/// α^i for any signed exponent (reduced mod 255).
#[inline]
pub fn alpha_pow(i: i32) -> u8 {
    let e = i.rem_euclid(FIELD_ORDER as i32) as usize;
    exp_table()[e]
}

/// Discrete log base α. Panics on zero.
#[inline]
pub fn gf_log(a: u8) -> u8 {
    assert!(a != 0, "log of 0 is undefined in GF(256)");
    log_table()[a as usize]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
