//! I/O utilities for the stabilizer circuit optimizer.
//!
//! Reads and writes the text forms of circuits and detector error models,
//! bit-packed sample files (.b8), and the row text used by code tables.

/// Code-table lookup and the `[x-bits|z-bits]` row text.
///
/// Defines the `CodeTable` trait used to obtain starting parity matrices by
/// code parameters, an in-memory table of well-known codes, and the parser
/// for table answers.
pub mod code_table;

/// File loading utilities for sample data.
///
/// Reads and writes bit-packed .b8 files and splits them into per-shot
/// bit vectors. Each shot is padded to a byte boundary.
pub mod loader;

/// Parsers for the circuit and detector-error-model text forms.
pub mod parser;
