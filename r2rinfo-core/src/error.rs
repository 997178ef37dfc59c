use thiserror::Error;

/// Fatal conditions raised while decoding a ReadyToRun header.
///
/// Unrecognized section type codes are not represented here: they are
/// recoverable and go through the warning sink instead, see
/// [`crate::header::WarningSink`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// A fixed-width read would run past the end of the image buffer.
    #[error("truncated input: {wanted}-byte read at offset {offset:#x} runs past end of image")]
    TruncatedInput { offset: u64, wanted: usize },

    /// The 4-byte magic did not match the expected "RTR" signature.
    #[error("invalid ReadyToRun signature {found:#010x} at offset {offset:#x} (expected 0x00525452)")]
    InvalidSignature { offset: u64, found: u32 },

    /// The decoded section count is negative.
    #[error("invalid section count {count} at offset {offset:#x}")]
    InvalidSectionCount { offset: u64, count: i32 },
}
