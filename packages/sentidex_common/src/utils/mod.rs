pub mod varint;
pub mod weights;
