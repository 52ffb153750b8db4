//! Parsing engines: attribute maps, media types, multipart framing, the
//! MIME part-tree builder, header-field decoding, and Received-chain
//! heuristics.

pub mod attrs;
pub mod fields;
pub mod media_type;
pub mod multipart;
pub mod received;
pub mod tree;
pub mod word;
