//! Parity-check description of a stabilizer code.
//!
//! A code is held as a pair of binary matrices of identical shape, one row
//! per check and one column per data qubit. The bit pair at `(row, col)`
//! selects the Pauli the check applies to that data qubit.

use crate::bit_utils::BitPack;
use crate::error::{Result, StabOptError};
use core::fmt;
use serde::Serialize;

/// Single-qubit Pauli symbol, phases ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    /// Decodes an `(x, z)` bit pair: (0,0)=I, (1,0)=X, (0,1)=Z, (1,1)=Y.
    pub fn from_bits(x: bool, z: bool) -> Self {
        match (x, z) {
            (false, false) => Pauli::I,
            (true, false) => Pauli::X,
            (false, true) => Pauli::Z,
            (true, true) => Pauli::Y,
        }
    }

    pub fn bits(self) -> (bool, bool) {
        match self {
            Pauli::I => (false, false),
            Pauli::X => (true, false),
            Pauli::Z => (false, true),
            Pauli::Y => (true, true),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            'I' | '_' => Some(Pauli::I),
            'X' => Some(Pauli::X),
            'Y' => Some(Pauli::Y),
            'Z' => Some(Pauli::Z),
            _ => None,
        }
    }
}

/// One stabilizer generator as a string of Paulis over the data qubits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Stabilizer(Vec<Pauli>);

impl Stabilizer {
    pub fn new(paulis: Vec<Pauli>) -> Self {
        Self(paulis)
    }

    /// Parses a string such as `"XIYZX"`.
    pub fn parse(text: &str) -> Result<Self> {
        text.trim()
            .chars()
            .map(|c| {
                Pauli::from_symbol(c).ok_or_else(|| {
                    StabOptError::invalid("pauli", c, "one of I, X, Y, Z")
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paulis(&self) -> &[Pauli] {
        &self.0
    }

    /// Non-identity positions with their Pauli, ascending by qubit.
    pub fn support(&self) -> impl Iterator<Item = (usize, Pauli)> + '_ {
        self.0
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| *p != Pauli::I)
    }

    pub fn weight(&self) -> usize {
        self.support().count()
    }
}

impl fmt::Display for Stabilizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for p in &self.0 {
            write!(f, "{}", p.symbol())?;
        }
        Ok(())
    }
}

/// Checks every stabilizer has the same, non-zero length. Returns that length.
pub fn uniform_length(stabilizers: &[Stabilizer]) -> Result<usize> {
    let first = stabilizers.first().ok_or(StabOptError::EmptyCode)?;
    let expected = first.len();
    if expected == 0 {
        return Err(StabOptError::EmptyCode);
    }
    for (index, s) in stabilizers.iter().enumerate() {
        if s.len() != expected {
            return Err(StabOptError::RaggedStabilizers {
                index,
                expected,
                actual: s.len(),
            });
        }
    }
    Ok(expected)
}

/// X-part and Z-part parity matrices of a stabilizer code.
///
/// The shape invariant is enforced by every constructor: both parts have
/// `num_checks` rows of `num_data_qubits` entries, and neither dimension is
/// zero. Values are never mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParityMatrixPair {
    x: Vec<Vec<bool>>,
    z: Vec<Vec<bool>>,
}

impl ParityMatrixPair {
    /// Builds a pair from boolean rows.
    ///
    /// # Errors
    ///
    /// `EmptyCode` when there are no rows or no columns, `RaggedStabilizers`
    /// when rows within a part differ in length, `ShapeMismatch` when the
    /// parts differ in shape.
    pub fn new(x: Vec<Vec<bool>>, z: Vec<Vec<bool>>) -> Result<Self> {
        let x_cols = row_width(&x)?;
        let z_cols = row_width(&z)?;
        if x.len() != z.len() || x_cols != z_cols {
            return Err(StabOptError::ShapeMismatch {
                x_rows: x.len(),
                x_cols,
                z_rows: z.len(),
                z_cols,
            });
        }
        Ok(Self { x, z })
    }

    /// Builds a pair from integer rows, rejecting anything but 0 and 1.
    pub fn from_rows(x: &[Vec<i64>], z: &[Vec<i64>]) -> Result<Self> {
        Self::new(to_bits(x)?, to_bits(z)?)
    }

    pub fn from_stabilizers(stabilizers: &[Stabilizer]) -> Result<Self> {
        uniform_length(stabilizers)?;
        let (x, z) = stabilizers
            .iter()
            .map(|s| s.paulis().iter().map(|p| p.bits()).unzip())
            .unzip();
        Self::new(x, z)
    }

    /// Builds a pair from stabilizer strings such as `["XZZXI", "IXZZX"]`.
    pub fn from_strings<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let stabilizers = rows
            .iter()
            .map(|r| Stabilizer::parse(r.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_stabilizers(&stabilizers)
    }

    pub(crate) fn zeros(num_checks: usize, num_data_qubits: usize) -> Result<Self> {
        let rows = vec![vec![false; num_data_qubits]; num_checks];
        Self::new(rows.clone(), rows)
    }

    pub(crate) fn set(&mut self, row: usize, col: usize, x: bool, z: bool) {
        self.x[row][col] |= x;
        self.z[row][col] |= z;
    }

    pub fn num_checks(&self) -> usize {
        self.x.len()
    }

    pub fn num_data_qubits(&self) -> usize {
        self.x[0].len()
    }

    pub fn pauli(&self, row: usize, col: usize) -> Pauli {
        Pauli::from_bits(self.x[row][col], self.z[row][col])
    }

    pub fn x_bits(&self) -> &[Vec<bool>] {
        &self.x
    }

    pub fn z_bits(&self) -> &[Vec<bool>] {
        &self.z
    }

    /// X part as `0/1` integer rows.
    pub fn x_part(&self) -> Vec<Vec<u8>> {
        as_ints(&self.x)
    }

    /// Z part as `0/1` integer rows.
    pub fn z_part(&self) -> Vec<Vec<u8>> {
        as_ints(&self.z)
    }

    /// One stabilizer per row, one symbol per data qubit.
    pub fn stabilizers(&self) -> Vec<Stabilizer> {
        (0..self.num_checks())
            .map(|r| {
                Stabilizer::new(
                    (0..self.num_data_qubits())
                        .map(|c| self.pauli(r, c))
                        .collect(),
                )
            })
            .collect()
    }

    /// Number of non-identity entries in each check.
    pub fn row_weights(&self) -> Vec<usize> {
        (0..self.num_checks())
            .map(|r| {
                (0..self.num_data_qubits())
                    .filter(|&c| self.pauli(r, c) != Pauli::I)
                    .count()
            })
            .collect()
    }

    /// Number of checks acting non-trivially on each data qubit.
    pub fn column_usage(&self) -> Vec<usize> {
        (0..self.num_data_qubits())
            .map(|c| {
                (0..self.num_checks())
                    .filter(|&r| self.pauli(r, c) != Pauli::I)
                    .count()
            })
            .collect()
    }

    /// Rank of the checks over GF(2), i.e. the number of independent
    /// stabilizer generators.
    pub fn num_independent_checks(&self) -> usize {
        let reduced = self.reduce_x();
        reduced.pivots.len() + reduced.z_span_rank(self.num_data_qubits())
    }

    /// Data qubits of a Z-type logical operator of the code.
    ///
    /// The returned support meets the X part of every check in an even
    /// number of positions, so its Z parity commutes with every stabilizer,
    /// and it is not a product of the checks. `None` when no such operator
    /// exists, e.g. for a code encoding no logical qubit.
    pub fn z_logical_support(&self) -> Option<Vec<usize>> {
        let n = self.num_data_qubits();
        let reduced = self.reduce_x();
        let rank = reduced.z_span_rank(n);
        (0..n)
            .filter(|c| !reduced.pivots.contains(c))
            .map(|free| {
                let mut v = vec![0u64; BitPack::words(n)];
                BitPack::set(&mut v, free, true);
                for (row, &pivot) in reduced.rows.iter().zip(&reduced.pivots) {
                    if BitPack::get(row, free) {
                        BitPack::set(&mut v, pivot, true);
                    }
                }
                v
            })
            .find(|v| reduced.z_span_rank_with(n, v) > rank)
            .map(|v| BitPack::ones(&v).collect())
    }

    /// Whether the Z parity of `support` is a logical operator: it commutes
    /// with every check and is not a product of checks.
    pub fn is_z_logical(&self, support: &[usize]) -> bool {
        let n = self.num_data_qubits();
        if support.iter().any(|&q| q >= n) {
            return false;
        }
        let commutes = self
            .x
            .iter()
            .all(|row| support.iter().filter(|&&q| row[q]).count() % 2 == 0);
        if !commutes {
            return false;
        }
        let mut v = vec![0u64; BitPack::words(n)];
        for &q in support {
            BitPack::toggle(&mut v, q);
        }
        let reduced = self.reduce_x();
        reduced.z_span_rank_with(n, &v) > reduced.z_span_rank(n)
    }

    /// Checks as packed `[x | z]` rows, fully reduced on the X columns.
    fn reduce_x(&self) -> ReducedChecks {
        let n = self.num_data_qubits();
        let mut rows: Vec<Vec<u64>> = self
            .x
            .iter()
            .zip(&self.z)
            .map(|(xr, zr)| {
                let mut row = vec![0u64; BitPack::words(2 * n)];
                for c in 0..n {
                    BitPack::set(&mut row, c, xr[c]);
                    BitPack::set(&mut row, n + c, zr[c]);
                }
                row
            })
            .collect();
        let pivots = eliminate(&mut rows, 0..n);
        let z_only = rows
            .split_off(pivots.len())
            .into_iter()
            .map(|row| {
                let mut z = vec![0u64; BitPack::words(n)];
                for c in (0..n).filter(|&c| BitPack::get(&row, n + c)) {
                    BitPack::set(&mut z, c, true);
                }
                z
            })
            .collect();
        ReducedChecks { rows, pivots, z_only }
    }
}

/// Row-echelon form of a code's checks.
///
/// `rows[i]` has its X pivot at `pivots[i]` and no other X bit in a pivot
/// column. `z_only` holds the Z parts of the check products with an empty
/// X part; they span the Z-type stabilizers.
struct ReducedChecks {
    rows: Vec<Vec<u64>>,
    pivots: Vec<usize>,
    z_only: Vec<Vec<u64>>,
}

impl ReducedChecks {
    fn z_span_rank(&self, n: usize) -> usize {
        eliminate(&mut self.z_only.clone(), 0..n).len()
    }

    fn z_span_rank_with(&self, n: usize, extra: &[u64]) -> usize {
        let mut rows = self.z_only.clone();
        rows.push(extra.to_vec());
        eliminate(&mut rows, 0..n).len()
    }
}

/// Gauss-Jordan elimination over GF(2) on the given columns. Returns the
/// pivot column of each leading row; the remaining rows are zero on
/// `columns`.
fn eliminate(rows: &mut [Vec<u64>], columns: core::ops::Range<usize>) -> Vec<usize> {
    let mut pivots = Vec::new();
    for col in columns {
        let r = pivots.len();
        let Some(found) = (r..rows.len()).find(|&i| BitPack::get(&rows[i], col)) else {
            continue;
        };
        rows.swap(r, found);
        let pivot = rows[r].clone();
        for (i, row) in rows.iter_mut().enumerate() {
            if i != r && BitPack::get(row, col) {
                BitPack::xor_into(row, &pivot);
            }
        }
        pivots.push(col);
    }
    pivots
}

impl fmt::Display for ParityMatrixPair {
    /// Code-table row form: `[x bits|z bits]`, one check per line.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (r, (xr, zr)) in self.x.iter().zip(&self.z).enumerate() {
            if r > 0 {
                writeln!(f)?;
            }
            let join = |row: &[bool]| {
                row.iter()
                    .map(|&b| if b { "1" } else { "0" })
                    .collect::<Vec<_>>()
                    .join(" ")
            };
            write!(f, "[{}|{}]", join(xr), join(zr))?;
        }
        Ok(())
    }
}

fn row_width(rows: &[Vec<bool>]) -> Result<usize> {
    let width = rows.first().map(|r| r.len()).ok_or(StabOptError::EmptyCode)?;
    if width == 0 {
        return Err(StabOptError::EmptyCode);
    }
    for (index, r) in rows.iter().enumerate() {
        if r.len() != width {
            return Err(StabOptError::RaggedStabilizers {
                index,
                expected: width,
                actual: r.len(),
            });
        }
    }
    Ok(width)
}

fn to_bits(rows: &[Vec<i64>]) -> Result<Vec<Vec<bool>>> {
    rows.iter()
        .enumerate()
        .map(|(row, r)| {
            r.iter()
                .enumerate()
                .map(|(col, &value)| match value {
                    0 => Ok(false),
                    1 => Ok(true),
                    _ => Err(StabOptError::InvalidBit { row, col, value }),
                })
                .collect()
        })
        .collect()
}

fn as_ints(rows: &[Vec<bool>]) -> Vec<Vec<u8>> {
    rows.iter()
        .map(|r| r.iter().map(|&b| b as u8).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example() -> ParityMatrixPair {
        ParityMatrixPair::from_rows(
            &[
                vec![1, 0, 1, 0, 1],
                vec![0, 0, 1, 1, 0],
                vec![0, 1, 1, 1, 1],
                vec![0, 0, 0, 0, 0],
            ],
            &[
                vec![0, 0, 1, 1, 0],
                vec![1, 0, 0, 1, 1],
                vec![0, 0, 0, 0, 0],
                vec![0, 1, 1, 1, 1],
            ],
        )
        .unwrap()
    }

    #[test]
    fn stabilizer_strings() {
        let s: Vec<String> = example().stabilizers().iter().map(|s| s.to_string()).collect();
        assert_eq!(s, ["XIYZX", "ZIXYZ", "IXXXX", "IZZZZ"]);
    }

    #[test]
    fn strings_round_trip() {
        let p = ParityMatrixPair::from_strings(&["XIYZX", "ZIXYZ", "IXXXX", "IZZZZ"]).unwrap();
        assert_eq!(p, example());
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = ParityMatrixPair::new(vec![vec![true, false]], vec![vec![true]]).unwrap_err();
        assert!(matches!(err, StabOptError::ShapeMismatch { .. }));
        let err = ParityMatrixPair::new(
            vec![vec![true, false]],
            vec![vec![true, false], vec![false, false]],
        )
        .unwrap_err();
        assert!(matches!(err, StabOptError::ShapeMismatch { .. }));
    }

    #[test]
    fn ragged_and_empty_are_rejected() {
        let err = ParityMatrixPair::from_strings(&["XX", "XXX"]).unwrap_err();
        assert_eq!(
            err,
            StabOptError::RaggedStabilizers {
                index: 1,
                expected: 2,
                actual: 3
            }
        );
        assert_eq!(
            ParityMatrixPair::new(vec![], vec![]).unwrap_err(),
            StabOptError::EmptyCode
        );
    }

    #[test]
    fn non_binary_entry_is_rejected() {
        let err = ParityMatrixPair::from_rows(&[vec![0, 2]], &[vec![0, 0]]).unwrap_err();
        assert_eq!(err, StabOptError::InvalidBit { row: 0, col: 1, value: 2 });
    }

    #[test]
    fn weights_and_usage() {
        let p = example();
        assert_eq!(p.row_weights(), vec![4, 4, 4, 4]);
        assert_eq!(p.column_usage(), vec![2, 2, 4, 4, 4]);
    }

    #[test]
    fn derived_logical_commutes_with_every_check() {
        let p = example();
        let support = p.z_logical_support().unwrap();
        assert_eq!(support, vec![0, 2, 3]);
        for s in p.stabilizers() {
            let anticommuting = support
                .iter()
                .filter(|&&q| matches!(s.paulis()[q], Pauli::X | Pauli::Y))
                .count();
            assert_eq!(anticommuting % 2, 0, "{s}");
        }
        assert!(p.is_z_logical(&support));
    }

    #[test]
    fn logical_checks() {
        let p = example();
        // Anticommutes with XIYZX.
        assert!(!p.is_z_logical(&[0, 1, 2, 3, 4]));
        // IZZZZ itself is a stabilizer.
        assert!(!p.is_z_logical(&[1, 2, 3, 4]));
        assert!(!p.is_z_logical(&[9]));

        let repetition = ParityMatrixPair::from_strings(&["ZZI", "IZZ"]).unwrap();
        assert_eq!(repetition.z_logical_support(), Some(vec![0]));
        assert!(!repetition.is_z_logical(&[0, 2]));

        // [[2, 0]]: every Z-type operator commuting with XX is a stabilizer.
        let bell = ParityMatrixPair::from_strings(&["XX", "ZZ"]).unwrap();
        assert_eq!(bell.z_logical_support(), None);
    }

    #[test]
    fn independent_checks() {
        assert_eq!(example().num_independent_checks(), 4);
        let dependent = ParityMatrixPair::from_strings(&["ZZI", "IZZ", "ZIZ", "III"]).unwrap();
        assert_eq!(dependent.num_independent_checks(), 2);
        let mixed = ParityMatrixPair::from_strings(&["XX", "ZZ", "YY"]).unwrap();
        assert_eq!(mixed.num_independent_checks(), 2);
    }

    #[test]
    fn row_text_form() {
        let p = ParityMatrixPair::from_strings(&["XZ", "ZY"]).unwrap();
        assert_eq!(p.to_string(), "[1 0|0 1]\n[0 1|1 1]");
    }
}
