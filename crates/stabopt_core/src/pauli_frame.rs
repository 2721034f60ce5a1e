//! Pauli frame tracking for stabilizer circuit simulation.
//!
//! Tracks which qubits currently carry an X or Z error relative to a
//! noiseless reference run, without storing the quantum state. Clifford
//! gates update the frame by conjugation; a Z-basis measurement is flipped
//! exactly when its qubit carries an X component.

use crate::bit_utils::BitPack;

/// Pauli frame tracking X and Z errors on every qubit.
///
/// Maintains two packed bit vectors (X and Z registers) where each bit
/// indicates whether the corresponding qubit has accumulated an X or Z
/// error. Phases are not tracked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauliFrame {
    /// Bit vector tracking X errors on each qubit.
    x_register: Vec<u64>,

    /// Bit vector tracking Z errors on each qubit.
    z_register: Vec<u64>,

    num_qubits: usize,
}

impl PauliFrame {
    /// Creates an error-free frame over `num_qubits` qubits.
    pub fn new(num_qubits: usize) -> Self {
        let words = BitPack::words(num_qubits);
        Self {
            x_register: vec![0; words],
            z_register: vec![0; words],
            num_qubits,
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Clears both registers.
    pub fn reset(&mut self) {
        self.x_register.fill(0);
        self.z_register.fill(0);
    }

    /// Clears the errors of one qubit, as a reset to |0> does.
    pub fn reset_qubit(&mut self, q: usize) {
        BitPack::set(&mut self.x_register, q, false);
        BitPack::set(&mut self.z_register, q, false);
    }

    /// Multiplies the Pauli with bits `(x, z)` into qubit `q`.
    pub fn apply_pauli(&mut self, q: usize, x: bool, z: bool) {
        if x {
            BitPack::toggle(&mut self.x_register, q);
        }
        if z {
            BitPack::toggle(&mut self.z_register, q);
        }
    }

    /// Applies a Hadamard gate to the specified qubit.
    ///
    /// The Hadamard gate conjugates X to Z and Z to X, so the frame update
    /// swaps the X and Z error bits for this qubit.
    pub fn apply_hadamard(&mut self, q: usize) {
        let has_x = BitPack::get(&self.x_register, q);
        let has_z = BitPack::get(&self.z_register, q);
        BitPack::set(&mut self.x_register, q, has_z);
        BitPack::set(&mut self.z_register, q, has_x);
    }

    /// Applies S or S dagger. Both map X to ±Y, so up to phase the Z bit
    /// picks up the X bit.
    pub fn apply_phase(&mut self, q: usize) {
        if BitPack::get(&self.x_register, q) {
            BitPack::toggle(&mut self.z_register, q);
        }
    }

    /// Applies a CNOT gate with control and target qubits.
    ///
    /// CNOT conjugates X_c to X_c X_t and Z_t to Z_c Z_t: an X error on the
    /// control spreads to the target, a Z error on the target spreads to
    /// the control.
    ///
    /// # Arguments
    ///
    /// * `c` - Control qubit index
    /// * `t` - Target qubit index
    pub fn apply_cnot(&mut self, c: usize, t: usize) {
        if BitPack::get(&self.x_register, c) {
            BitPack::toggle(&mut self.x_register, t);
        }
        if BitPack::get(&self.z_register, t) {
            BitPack::toggle(&mut self.z_register, c);
        }
    }

    /// Applies a CZ gate. An X error on either qubit adds a Z error to the
    /// other.
    pub fn apply_cz(&mut self, a: usize, b: usize) {
        let xa = BitPack::get(&self.x_register, a);
        let xb = BitPack::get(&self.x_register, b);
        if xa {
            BitPack::toggle(&mut self.z_register, b);
        }
        if xb {
            BitPack::toggle(&mut self.z_register, a);
        }
    }

    /// Applies a controlled-Y gate, `S_t · CNOT(c, t) · S_t^†`.
    pub fn apply_cy(&mut self, c: usize, t: usize) {
        self.apply_phase(t);
        self.apply_cnot(c, t);
        self.apply_phase(t);
    }

    pub fn apply_swap(&mut self, a: usize, b: usize) {
        for reg in [&mut self.x_register, &mut self.z_register] {
            let va = BitPack::get(&reg[..], a);
            let vb = BitPack::get(&reg[..], b);
            BitPack::set(&mut reg[..], a, vb);
            BitPack::set(&mut reg[..], b, va);
        }
    }

    /// Checks whether the specified qubit has an X error in the frame.
    ///
    /// A qubit with an X error produces a flipped Z-basis measurement
    /// compared to the noiseless reference.
    pub fn has_x_error(&self, q: usize) -> bool {
        BitPack::get(&self.x_register, q)
    }

    pub fn has_z_error(&self, q: usize) -> bool {
        BitPack::get(&self.z_register, q)
    }

    pub fn is_clean(&self) -> bool {
        BitPack::is_zero(&self.x_register) && BitPack::is_zero(&self.z_register)
    }
}
