use thiserror::Error;

/// Low-level failures raised while walking a container's bytes.
///
/// These never escape [`extract`](crate::metadata::extract): the assembler
/// turns them into [`Diagnostic`](crate::metadata::Diagnostic)s and keeps
/// whatever was decoded before the failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A read asked for more bytes than remain in the buffer.
    #[error("read of {wanted} byte(s) at offset {offset} overruns buffer ({remaining} remaining)")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },
    /// The first 8 bytes are not the PNG signature.
    #[error("not a PNG file (signature mismatch)")]
    NotPng,
    /// The first 2 bytes are not the JPEG SOI marker.
    #[error("not a JPEG file (missing FF D8 marker)")]
    NotJpeg,
}

pub type Result<T> = std::result::Result<T, Error>;
