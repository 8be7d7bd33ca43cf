//! Decoding of standard EXIF tags through `nom-exif`.
//!
//! The engine in [`metadata`](crate::metadata) takes tag maps as input and
//! never decodes them itself; [`decode_tags`] is the decoder the
//! [`pipeline`](crate::pipeline) plugs in. Only the generic IFD entries are
//! rendered here. The generator payload hidden in `UserComment` is read
//! separately by [`container::jpeg`](crate::container::jpeg).

mod reader;

pub use reader::decode_tags;
