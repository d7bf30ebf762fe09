pub mod array;
pub mod misc;
