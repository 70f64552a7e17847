//! Wire protocol and stream encoding.

pub mod encoder;
pub mod wire;

pub use encoder::{transform, StreamEncoder};
pub use wire::{decode_line, WireEvent, END_OF_STREAM};
