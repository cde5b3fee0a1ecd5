/// Opaque token generation
use rand::{rngs::OsRng, RngCore};

/// Generate `len` bytes from the OS CSPRNG, hex-encoded (`2 * len` characters)
pub fn generate_opaque_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
