//! Apple binary property list (`bplist00`) codec.
//!
//! References: CoreFoundation `CFBinaryPList.c`.

pub mod constants;
mod decoder;
mod encoder;
mod error;
mod shared;

pub use decoder::{BplistDecoder, DecoderOptions, Trailer};
pub use encoder::{BplistEncoder, EncoderOptions};
pub use error::BplistError;
pub use shared::{decode, encode};
