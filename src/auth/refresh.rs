use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};

pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Opaque refresh token: 256 bits from the OS CSPRNG, base64url-encoded.
/// Carries no claims; it is only meaningful against the stored value.
pub fn generate_refresh_token() -> String {
    let mut buf = [0u8; REFRESH_TOKEN_BYTES];
    OsRng.fill_bytes(&mut buf);
    Base64UrlUnpadded::encode_string(&buf)
}
