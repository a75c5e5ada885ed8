//! Raw chunk persistence.
//!
//! A persisted chunk is its cell array as little-endian `u32`s, nothing more.
//! File layout and compression are left to whoever stores the bytes.

use std::fmt;

use super::CHUNK_VOLUME;
use crate::engine_state::voxels::block::Cell;

/// Byte length of one serialized chunk.
pub const SERIALIZED_CHUNK_LEN: usize = CHUNK_VOLUME * std::mem::size_of::<Cell>();

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkCodecError {
    /// The buffer does not hold exactly one chunk worth of cells.
    WrongLength { expected: usize, actual: usize },
}

impl fmt::Display for ChunkCodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WrongLength { expected, actual } => write!(
                f,
                "serialized chunk has {actual} bytes, expected {expected}"
            ),
        }
    }
}

impl std::error::Error for ChunkCodecError {}

pub fn encode_cells(cells: &[Cell]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(cells.len() * std::mem::size_of::<Cell>());
    for cell in cells {
        bytes.extend_from_slice(&cell.to_le_bytes());
    }
    bytes
}

pub fn decode_cells(bytes: &[u8]) -> Result<Vec<Cell>, ChunkCodecError> {
    if bytes.len() != SERIALIZED_CHUNK_LEN {
        return Err(ChunkCodecError::WrongLength {
            expected: SERIALIZED_CHUNK_LEN,
            actual: bytes.len(),
        });
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|word| Cell::from_le_bytes([word[0], word[1], word[2], word[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_truncated_buffers() {
        let err = decode_cells(&[0u8; 12]).unwrap_err();
        assert_eq!(
            err,
            ChunkCodecError::WrongLength {
                expected: SERIALIZED_CHUNK_LEN,
                actual: 12
            }
        );
    }

    #[test]
    fn cells_are_little_endian() {
        let mut cells = vec![0; CHUNK_VOLUME];
        cells[0] = 0x0403_0201;
        let bytes = encode_cells(&cells);
        assert_eq!(&bytes[..4], &[1, 2, 3, 4]);
        assert_eq!(decode_cells(&bytes).unwrap(), cells);
    }
}
