//! Strkey codec for ed25519 keys.
//!
//! A strkey is `base32(version || payload || crc16_xmodem(version || payload))`
//! where the checksum is appended little-endian. Public keys encode to a
//! 56-character string starting with `G`, secret seeds to one starting with `S`.

use data_encoding::BASE32_NOPAD;

/// Version byte of an ed25519 public key (`G...`).
pub const VERSION_ED25519_PUBLIC_KEY: u8 = 6 << 3;

/// Version byte of an ed25519 secret seed (`S...`).
pub const VERSION_ED25519_SECRET_SEED: u8 = 18 << 3;

/// Length of the ed25519 payload.
pub const PAYLOAD_LEN: usize = 32;

/// Length of an encoded ed25519 strkey.
pub const ENCODED_LEN: usize = 56;

/// Decoded length: version byte + payload + 2 checksum bytes.
const DECODED_LEN: usize = 1 + PAYLOAD_LEN + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StrkeyError {
    #[error("invalid strkey length: expected 56 characters, got {0}")]
    InvalidLength(usize),
    #[error("strkey is not valid base32")]
    InvalidEncoding,
    #[error("unexpected version byte {actual:#04x}, expected {expected:#04x}")]
    InvalidVersion { expected: u8, actual: u8 },
    #[error("strkey checksum mismatch")]
    InvalidChecksum,
}

/// Decode an ed25519 public key (`G...`).
pub fn decode_ed25519_public_key(encoded: &str) -> Result<[u8; PAYLOAD_LEN], StrkeyError> {
    decode(VERSION_ED25519_PUBLIC_KEY, encoded)
}

/// Decode an ed25519 secret seed (`S...`).
pub fn decode_ed25519_secret_seed(encoded: &str) -> Result<[u8; PAYLOAD_LEN], StrkeyError> {
    decode(VERSION_ED25519_SECRET_SEED, encoded)
}

/// Encode an ed25519 public key as a `G...` strkey.
pub fn encode_ed25519_public_key(key: &[u8; PAYLOAD_LEN]) -> String {
    encode(VERSION_ED25519_PUBLIC_KEY, key)
}

/// Encode an ed25519 secret seed as an `S...` strkey.
pub fn encode_ed25519_secret_seed(seed: &[u8; PAYLOAD_LEN]) -> String {
    encode(VERSION_ED25519_SECRET_SEED, seed)
}

/// Decode a strkey, checking its version byte and checksum.
pub fn decode(version: u8, encoded: &str) -> Result<[u8; PAYLOAD_LEN], StrkeyError> {
    if encoded.len() != ENCODED_LEN {
        return Err(StrkeyError::InvalidLength(encoded.len()));
    }

    let decoded = BASE32_NOPAD
        .decode(encoded.as_bytes())
        .map_err(|_| StrkeyError::InvalidEncoding)?;
    if decoded.len() != DECODED_LEN {
        return Err(StrkeyError::InvalidEncoding);
    }

    if decoded[0] != version {
        return Err(StrkeyError::InvalidVersion {
            expected: version,
            actual: decoded[0],
        });
    }

    let (body, checksum) = decoded.split_at(1 + PAYLOAD_LEN);
    let expected = u16::from_le_bytes([checksum[0], checksum[1]]);
    if crc16_xmodem(body) != expected {
        return Err(StrkeyError::InvalidChecksum);
    }

    let mut payload = [0u8; PAYLOAD_LEN];
    payload.copy_from_slice(&body[1..]);
    Ok(payload)
}

/// Encode a 32-byte payload under the given version byte.
pub fn encode(version: u8, payload: &[u8; PAYLOAD_LEN]) -> String {
    let mut data = Vec::with_capacity(DECODED_LEN);
    data.push(version);
    data.extend_from_slice(payload);
    let checksum = crc16_xmodem(&data);
    data.extend_from_slice(&checksum.to_le_bytes());
    BASE32_NOPAD.encode(&data)
}

/// CRC16-XModem: polynomial 0x1021, initial value 0, no reflection.
pub fn crc16_xmodem(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}
