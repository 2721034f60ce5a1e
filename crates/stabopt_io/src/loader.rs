use anyhow::{Context, Result, bail};
use bitvec::prelude::*;
use stabopt_core::sampler::ShotBits;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

/// Loads a .b8 file (bit-packed sample data).
pub fn load_b8_file<P: AsRef<Path>>(path: P) -> Result<BitVec<u8, Lsb0>> {
    let mut file = File::open(path).context("Failed to open .b8 file")?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;

    // Little endian within each byte
    let bits = BitVec::<u8, Lsb0>::from_vec(buffer);
    Ok(bits)
}

/// Splits raw .b8 bits into shots of `bits_per_shot` bits.
///
/// Every shot starts on a byte boundary; padding bits are dropped.
pub fn slice_shots(raw_bits: &BitVec<u8, Lsb0>, bits_per_shot: usize) -> Result<Vec<ShotBits>> {
    let stride_bits = bits_per_shot.div_ceil(8) * 8;
    if stride_bits == 0 {
        return Ok(Vec::new());
    }
    if raw_bits.len() % stride_bits != 0 {
        bail!(
            "{} bits is not a whole number of {}-bit shots",
            raw_bits.len(),
            bits_per_shot
        );
    }

    let num_shots = raw_bits.len() / stride_bits;
    let mut shots = Vec::with_capacity(num_shots);
    for i in 0..num_shots {
        let start = i * stride_bits;
        let slice = &raw_bits[start..start + bits_per_shot];
        shots.push(slice.iter().by_vals().collect::<ShotBits>());
    }
    Ok(shots)
}

/// Packs shots into .b8 bytes, each shot padded to a whole byte.
pub fn encode_b8(shots: &[ShotBits], bits_per_shot: usize) -> Result<Vec<u8>> {
    let mut out: BitVec<u8, Lsb0> = BitVec::with_capacity(shots.len() * bits_per_shot.div_ceil(8) * 8);
    for (i, shot) in shots.iter().enumerate() {
        if shot.len() != bits_per_shot {
            bail!("shot {} has {} bits, expected {}", i, shot.len(), bits_per_shot);
        }
        out.extend(shot.iter().by_vals());
        out.resize(out.len().div_ceil(8) * 8, false);
    }
    Ok(out.into_vec())
}

pub fn write_b8_file<P: AsRef<Path>>(path: P, shots: &[ShotBits], bits_per_shot: usize) -> Result<()> {
    let bytes = encode_b8(shots, bits_per_shot)?;
    let mut file = File::create(path.as_ref()).context("Failed to create .b8 file")?;
    file.write_all(&bytes)?;
    Ok(())
}

/// Loads a .b8 file straight into shots.
pub fn load_shots<P: AsRef<Path>>(path: P, bits_per_shot: usize) -> Result<Vec<ShotBits>> {
    let path = path.as_ref();
    if !fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) {
        bail!("{} is not a file", path.display());
    }
    slice_shots(&load_b8_file(path)?, bits_per_shot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shot(bits: &[u8]) -> ShotBits {
        bits.iter().map(|&b| b == 1).collect()
    }

    #[test]
    fn layout_is_lsb_first_and_byte_aligned() {
        let shots = vec![shot(&[1, 0, 0, 0, 0, 0, 0, 0, 1, 1]), shot(&[0, 1, 0, 0, 0, 0, 0, 0, 0, 1])];
        let bytes = encode_b8(&shots, 10).unwrap();
        assert_eq!(bytes, vec![0x01, 0x03, 0x02, 0x02]);
        let raw = BitVec::<u8, Lsb0>::from_vec(bytes);
        assert_eq!(slice_shots(&raw, 10).unwrap(), shots);
    }

    #[test]
    fn rejects_wrong_widths() {
        assert!(encode_b8(&[shot(&[1, 0])], 3).is_err());
        let raw = BitVec::<u8, Lsb0>::from_vec(vec![0u8; 3]);
        assert!(slice_shots(&raw, 10).is_err());
    }

    #[test]
    fn file_round_trip() {
        let path = std::env::temp_dir().join(format!("stabopt_loader_{}.b8", std::process::id()));
        let shots = vec![shot(&[1, 1, 0]), shot(&[0, 0, 1]), shot(&[0, 0, 0])];
        write_b8_file(&path, &shots, 3).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 3);
        assert_eq!(load_shots(&path, 3).unwrap(), shots);
        fs::remove_file(&path).unwrap();
        assert!(load_shots(&path, 3).is_err());
    }
}
