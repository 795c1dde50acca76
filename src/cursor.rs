//! Block-strided read position over a plaintext buffer.

use crate::{
    aes::{Block, BLOCK_SIZE},
    error::{Error, Precondition},
};

pub struct StreamCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> StreamCursor<'a> {
    /// Fails unless `data` is a positive multiple of [`BLOCK_SIZE`] bytes.
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        if data.is_empty() {
            return Err(Precondition::EmptyImage.into());
        }

        if data.len() % BLOCK_SIZE != 0 {
            return Err(Precondition::UnalignedLength(data.len()).into());
        }

        Ok(Self { data, offset: 0 })
    }

    /// The block at the current position, `None` once the buffer is exhausted.
    pub fn block(&self) -> Option<Block> {
        self.data
            .get(self.offset..self.offset + BLOCK_SIZE)
            .and_then(Block::try_from_slice)
    }

    /// Moves one block forward. Returns `false` once the buffer is exhausted,
    /// after which the position no longer changes.
    pub fn advance(&mut self) -> bool {
        if self.remaining() > BLOCK_SIZE {
            self.offset += BLOCK_SIZE;
            true
        } else {
            self.offset = self.data.len();
            false
        }
    }

    /// Bytes from the current position to the end, the current block included.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn blocks(&self) -> usize {
        self.data.len() / BLOCK_SIZE
    }
}
