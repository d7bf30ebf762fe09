use md5::{Digest, Md5};

/// md5 hex digest of `bytes`.
pub fn hash_code(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}

pub(crate) fn digest(bytes: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Md5::digest(bytes));
    out
}
