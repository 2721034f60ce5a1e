pub struct BitPack;

impl BitPack {
    /// Words needed to hold `bits` bits.
    #[inline(always)]
    pub fn words(bits: usize) -> usize {
        bits.div_ceil(64)
    }

    #[inline(always)]
    pub fn get(storage: &[u64], index: usize) -> bool {
        let word = storage[index / 64];
        let bit = index % 64;
        (word >> bit) & 1 == 1
    }

    #[inline(always)]
    pub fn toggle(storage: &mut [u64], index: usize) {
        let word_idx = index / 64;
        let bit_idx = index % 64;
        storage[word_idx] ^= 1 << bit_idx;
    }

    #[inline(always)]
    pub fn set(storage: &mut [u64], index: usize, val: bool) {
        let word_idx = index / 64;
        let bit_idx = index % 64;
        if val {
            storage[word_idx] |= 1 << bit_idx;
        } else {
            storage[word_idx] &= !(1 << bit_idx);
        }
    }

    /// `dst ^= src`, word by word.
    #[inline(always)]
    pub fn xor_into(dst: &mut [u64], src: &[u64]) {
        for (d, s) in dst.iter_mut().zip(src) {
            *d ^= *s;
        }
    }

    #[inline(always)]
    pub fn is_zero(storage: &[u64]) -> bool {
        storage.iter().all(|&w| w == 0)
    }

    /// Indices of the set bits, ascending.
    pub fn ones(storage: &[u64]) -> impl Iterator<Item = usize> + '_ {
        storage.iter().enumerate().flat_map(|(w, &word)| {
            let mut rest = word;
            core::iter::from_fn(move || {
                if rest == 0 {
                    return None;
                }
                let bit = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                Some(w * 64 + bit)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::BitPack;

    #[test]
    fn set_get_toggle_across_words() {
        let mut s = vec![0u64; BitPack::words(130)];
        assert_eq!(s.len(), 3);
        BitPack::set(&mut s, 0, true);
        BitPack::set(&mut s, 129, true);
        BitPack::toggle(&mut s, 64);
        assert!(BitPack::get(&s, 0) && BitPack::get(&s, 64) && BitPack::get(&s, 129));
        BitPack::set(&mut s, 0, false);
        assert_eq!(BitPack::ones(&s).collect::<Vec<_>>(), vec![64, 129]);
    }

    #[test]
    fn xor_cancels() {
        let a = vec![0b1011u64, 7];
        let mut b = a.clone();
        BitPack::xor_into(&mut b, &a);
        assert!(BitPack::is_zero(&b));
    }
}
