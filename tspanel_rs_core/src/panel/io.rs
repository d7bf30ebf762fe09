//! # panel/io
//!
//! checksum-verified binary persistence of panels

mod bytes;
mod fs;

pub const MAGIC: &[u8; 8] = b"TSPANEL\0";
pub const VERSION: u32 = 1;
