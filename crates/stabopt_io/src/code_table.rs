//! Code-table lookup of starting parity matrices.
//!
//! A table answers `(n, k)` with row text in the `[x-bits|z-bits]` form, one
//! stabilizer generator per line, e.g. `[1 0 0 1 0|0 1 1 0 0]`.

use nom::{
    IResult,
    character::complete::{char, one_of, space0, space1},
    combinator::{all_consuming, map},
    multi::separated_list1,
    sequence::{delimited, separated_pair},
};
use stabopt_core::error::{Result, StabOptError};
use stabopt_core::parity::ParityMatrixPair;

/// Source of stabilizer codes by parameters.
pub trait CodeTable {
    /// Row text of a code with length `n` encoding `k` logical qubits.
    fn lookup(&self, n: usize, k: usize) -> Result<String>;

    /// Data qubits of a Z-type logical operator of the `(n, k)` code, when
    /// the table records one.
    fn logical_support(&self, _n: usize, _k: usize) -> Result<Option<Vec<usize>>> {
        Ok(None)
    }
}

/// Small in-memory table of well-known codes.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCodeTable;

/// `(n, k, checks, logical Z support)`.
const CODES: &[(usize, usize, &[&str], &[usize])] = &[
    (4, 2, &["XXXX", "ZZZZ"], &[0, 1]),
    (5, 1, &["XZZXI", "IXZZX", "XIXZZ", "ZXIXZ"], &[0, 1, 2, 3, 4]),
    (
        7,
        1,
        &["IIIXXXX", "IXXIIXX", "XIXIXIX", "IIIZZZZ", "IZZIIZZ", "ZIZIZIZ"],
        &[0, 1, 2],
    ),
    (
        9,
        1,
        &[
            "ZZIIIIIII",
            "IZZIIIIII",
            "IIIZZIIII",
            "IIIIZZIII",
            "IIIIIIZZI",
            "IIIIIIIZZ",
            "XXXXXXIII",
            "IIIXXXXXX",
        ],
        &[0, 3, 6],
    ),
];

impl BuiltinCodeTable {
    fn entry(n: usize, k: usize) -> Result<(&'static [&'static str], &'static [usize])> {
        CODES
            .iter()
            .find(|(cn, ck, _, _)| *cn == n && *ck == k)
            .map(|&(_, _, rows, logical)| (rows, logical))
            .ok_or(StabOptError::LookupFailure { n, k })
    }
}

impl CodeTable for BuiltinCodeTable {
    fn lookup(&self, n: usize, k: usize) -> Result<String> {
        let (rows, _) = Self::entry(n, k)?;
        Ok(format_code_rows(&ParityMatrixPair::from_strings(rows)?))
    }

    fn logical_support(&self, n: usize, k: usize) -> Result<Option<Vec<usize>>> {
        let (_, logical) = Self::entry(n, k)?;
        Ok(Some(logical.to_vec()))
    }
}

/// Row text of `parity`, one `[x|z]` line per check.
pub fn format_code_rows(parity: &ParityMatrixPair) -> String {
    let bits = |row: &[bool]| {
        row.iter()
            .map(|&b| if b { "1" } else { "0" })
            .collect::<Vec<_>>()
            .join(" ")
    };
    parity
        .x_bits()
        .iter()
        .zip(parity.z_bits())
        .map(|(x, z)| format!("[{}|{}]\n", bits(x), bits(z)))
        .collect()
}

fn bit_row(input: &str) -> IResult<&str, Vec<i64>> {
    separated_list1(space1, map(one_of("01"), |c| if c == '1' { 1 } else { 0 }))(input)
}

fn code_row(input: &str) -> IResult<&str, (Vec<i64>, Vec<i64>)> {
    all_consuming(delimited(
        char('['),
        separated_pair(
            delimited(space0, bit_row, space0),
            char('|'),
            delimited(space0, bit_row, space0),
        ),
        char(']'),
    ))(input)
}

/// Parses row text into a parity matrix pair.
///
/// Blank lines are skipped. Any other line that is not a bracketed
/// `x|z` row makes the whole response malformed.
pub fn parse_code_rows(text: &str) -> Result<ParityMatrixPair> {
    let mut x = Vec::new();
    let mut z = Vec::new();
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (_, (xr, zr)) = code_row(line).map_err(|_| StabOptError::MalformedResponse(line.to_string()))?;
        x.push(xr);
        z.push(zr);
    }
    if x.is_empty() {
        return Err(StabOptError::MalformedResponse(text.to_string()));
    }
    ParityMatrixPair::from_rows(&x, &z)
}

/// Looks up `(n, k)` in `table` and parses the answer.
pub fn load_code(table: &dyn CodeTable, n: usize, k: usize) -> Result<ParityMatrixPair> {
    parse_code_rows(&table.lookup(n, k)?)
}
