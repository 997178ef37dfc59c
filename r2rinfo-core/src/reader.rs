use crate::error::FormatError;
use byteorder::{ReadBytesExt, LE};
use std::io::Cursor;

/// Cursor over an image buffer that reads fixed-width little-endian
/// integers, advancing by the width of each read.
///
/// A read past the end of the buffer surfaces as
/// [`FormatError::TruncatedInput`] carrying the offset the read began
/// at and the number of bytes it needed.
pub struct ImageReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> ImageReader<'a> {
    pub fn new(image: &'a [u8], offset: usize) -> Self {
        let mut cursor = Cursor::new(image);
        cursor.set_position(offset as u64);
        Self { cursor }
    }

    /// Current byte position within the image buffer.
    pub fn pos(&self) -> u64 {
        self.cursor.position()
    }

    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        let offset = self.cursor.position();
        self.cursor
            .read_u16::<LE>()
            .map_err(|_| FormatError::TruncatedInput { offset, wanted: 2 })
    }

    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        let offset = self.cursor.position();
        self.cursor
            .read_u32::<LE>()
            .map_err(|_| FormatError::TruncatedInput { offset, wanted: 4 })
    }

    pub fn read_i32(&mut self) -> Result<i32, FormatError> {
        let offset = self.cursor.position();
        self.cursor
            .read_i32::<LE>()
            .map_err(|_| FormatError::TruncatedInput { offset, wanted: 4 })
    }
}
