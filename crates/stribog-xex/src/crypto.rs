//! XEX payload decryption using AES-128.
//!
//! The container embeds a per-title session key, itself AES-ECB-encrypted
//! under the all-zero retail key. Payload data is AES-128-CBC with the
//! session key and a zero IV; CBC chaining is continuous over the whole
//! payload, so the IV state must persist across blocks and chunks.

use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, KeyInit, KeyIvInit};

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// The retail key-encryption key. Dev/devkit keys are not supported.
pub const RETAIL_KEY: [u8; 16] = [0u8; 16];

/// Decrypt the 16-byte session key in a single AES-ECB block.
pub fn decrypt_session_key(encrypted: &[u8; 16], kek: &[u8; 16]) -> [u8; 16] {
    let cipher = aes::Aes128::new(GenericArray::from_slice(kek));
    let mut block = GenericArray::clone_from_slice(encrypted);
    cipher.decrypt_block(&mut block);
    block.into()
}

/// AES-128-CBC decryption whose IV state survives across calls.
pub struct CbcStream {
    decryptor: Aes128CbcDec,
}

impl CbcStream {
    /// Start a CBC stream with a zero IV.
    pub fn new(key: &[u8; 16]) -> Self {
        let iv = [0u8; 16];
        Self {
            decryptor: Aes128CbcDec::new(
                GenericArray::from_slice(key),
                GenericArray::from_slice(&iv),
            ),
        }
    }

    /// Decrypt every whole 16-byte block of `data` in place.
    ///
    /// Trailing bytes past the last full block are left untouched.
    pub fn decrypt(&mut self, data: &mut [u8]) {
        for block in data.chunks_exact_mut(16) {
            self.decryptor
                .decrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}
