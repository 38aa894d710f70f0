//! Cipher adapter: AES-128-CBC (PKCS#7) and AES-128-CTR.
//!
//! Unauthenticated on its own. Callers verify the MAC before decrypting.

use aes::cipher::{
    block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher,
};
use aes::Aes128;

use crate::error::OperationFault;
use crate::version::{CipherMode, IV_BYTES, KEY_BYTE_SIZE};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes128Ctr = ctr::Ctr128BE<Aes128>;

fn check_lengths(key: &[u8], iv: &[u8]) -> Result<(), OperationFault> {
    if key.len() != KEY_BYTE_SIZE {
        return Err(OperationFault::BadKeyLength {
            expected: KEY_BYTE_SIZE,
            actual: key.len(),
        });
    }
    if iv.len() != IV_BYTES {
        return Err(OperationFault::CipherFailed);
    }
    Ok(())
}

/// Encrypt path.
pub fn encrypt(
    mode: CipherMode,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
) -> Result<Vec<u8>, OperationFault> {
    check_lengths(key, iv)?;
    match mode {
        CipherMode::Aes128Cbc => {
            let cipher = Aes128CbcEnc::new_from_slices(key, iv)
                .map_err(|_| OperationFault::CipherUnavailable)?;
            Ok(cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext))
        }
        CipherMode::Aes128Ctr => apply_ctr(key, iv, plaintext),
    }
}

/// Decrypt path. Bad padding surfaces as [`OperationFault::CipherFailed`].
pub fn decrypt(
    mode: CipherMode,
    key: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, OperationFault> {
    check_lengths(key, iv)?;
    match mode {
        CipherMode::Aes128Cbc => {
            let cipher = Aes128CbcDec::new_from_slices(key, iv)
                .map_err(|_| OperationFault::CipherUnavailable)?;
            cipher
                .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
                .map_err(|_| OperationFault::CipherFailed)
        }
        CipherMode::Aes128Ctr => apply_ctr(key, iv, ciphertext),
    }
}

fn apply_ctr(key: &[u8], iv: &[u8], input: &[u8]) -> Result<Vec<u8>, OperationFault> {
    let mut cipher =
        Aes128Ctr::new_from_slices(key, iv).map_err(|_| OperationFault::CipherUnavailable)?;
    let mut buf = input.to_vec();
    cipher
        .try_apply_keystream(&mut buf)
        .map_err(|_| OperationFault::CipherFailed)?;
    Ok(buf)
}

/// Whether `mode` can be instantiated and inverts itself on one block.
pub fn is_available(mode: CipherMode) -> bool {
    let key = [0u8; KEY_BYTE_SIZE];
    let iv = [0u8; IV_BYTES];
    let block = [0x5Au8; 16];
    encrypt(mode, &key, &iv, &block)
        .and_then(|ct| decrypt(mode, &key, &iv, &ct))
        .map(|pt| pt == block)
        .unwrap_or(false)
}
