pub mod debug;
pub mod sequence;
pub mod time;
