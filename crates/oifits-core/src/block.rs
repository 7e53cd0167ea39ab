/// FITS block size in bytes (each logical record is one block).
pub const BLOCK_SIZE: usize = 2880;

/// FITS card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte used for header blocks (ASCII space).
pub const HEADER_PAD_BYTE: u8 = 0x20;

/// Padding byte used for data blocks (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Returns the number of FITS blocks required to hold `num_bytes` bytes.
pub const fn blocks_needed(num_bytes: usize) -> usize {
    num_bytes.div_ceil(BLOCK_SIZE)
}

/// Returns the total byte length (in whole blocks) required to hold `num_bytes`.
pub const fn padded_byte_len(num_bytes: usize) -> usize {
    blocks_needed(num_bytes) * BLOCK_SIZE
}

/// Appends `pad_byte` to `buf` until its length is a whole number of blocks.
pub fn pad_to_block(buf: &mut Vec<u8>, pad_byte: u8) {
    let target = padded_byte_len(buf.len());
    buf.resize(target, pad_byte);
}

/// Returns true if `bytes` begins with the given keyword bytes.
pub fn block_starts_with(bytes: &[u8], keyword: &[u8]) -> bool {
    bytes.len() >= keyword.len() && &bytes[..keyword.len()] == keyword
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- blocks_needed ----

    #[test]
    fn blocks_needed_zero() {
        assert_eq!(blocks_needed(0), 0);
    }

    #[test]
    fn blocks_needed_boundaries() {
        assert_eq!(blocks_needed(1), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE), 1);
        assert_eq!(blocks_needed(BLOCK_SIZE + 1), 2);
        assert_eq!(blocks_needed(5761), 3);
    }

    // ---- padded_byte_len ----

    #[test]
    fn padded_byte_len_unaligned() {
        assert_eq!(padded_byte_len(1), BLOCK_SIZE);
        assert_eq!(padded_byte_len(BLOCK_SIZE + 1), 2 * BLOCK_SIZE);
        assert_eq!(padded_byte_len(2 * BLOCK_SIZE), 2 * BLOCK_SIZE);
    }

    #[test]
    fn constant_relationships() {
        assert_eq!(CARDS_PER_BLOCK, 36);
        assert_eq!(CARDS_PER_BLOCK * CARD_SIZE, BLOCK_SIZE);
    }

    // ---- pad_to_block ----

    #[test]
    fn pad_header_fills_with_spaces() {
        let mut buf = vec![b'A'; 80];
        pad_to_block(&mut buf, HEADER_PAD_BYTE);
        assert_eq!(buf.len(), BLOCK_SIZE);
        assert!(buf[80..].iter().all(|&b| b == HEADER_PAD_BYTE));
    }

    #[test]
    fn pad_data_fills_with_zeros() {
        let mut buf = vec![0xFFu8; BLOCK_SIZE + 500];
        pad_to_block(&mut buf, DATA_PAD_BYTE);
        assert_eq!(buf.len(), 2 * BLOCK_SIZE);
        assert!(buf[BLOCK_SIZE + 500..].iter().all(|&b| b == 0));
    }

    #[test]
    fn pad_aligned_is_noop() {
        let mut buf = vec![1u8; BLOCK_SIZE];
        pad_to_block(&mut buf, DATA_PAD_BYTE);
        assert_eq!(buf.len(), BLOCK_SIZE);
        let mut empty = Vec::new();
        pad_to_block(&mut empty, DATA_PAD_BYTE);
        assert!(empty.is_empty());
    }

    #[test]
    fn block_prefix_match() {
        assert!(block_starts_with(b"XTENSION= 'IMAGE   '", b"XTENSION"));
        assert!(!block_starts_with(b"SIMPLE  =", b"XTENSION"));
        assert!(!block_starts_with(b"XT", b"XTENSION"));
    }
}
