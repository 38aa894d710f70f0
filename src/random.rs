//! Secure random bytes from the OS CSPRNG.

use crate::error::OperationFault;

/// Fill `buf` from the OS.
pub fn fill(buf: &mut [u8]) -> Result<(), OperationFault> {
    getrandom::getrandom(buf).map_err(|e| {
        tracing::warn!(error = %e, "random source failed");
        OperationFault::RandomSourceFailed
    })
}

/// `len` fresh random bytes.
pub fn bytes(len: usize) -> Result<Vec<u8>, OperationFault> {
    let mut out = vec![0u8; len];
    fill(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        assert!(bytes(0).unwrap().is_empty());
        assert_eq!(bytes(32).unwrap().len(), 32);
    }

    #[test]
    fn draws_differ() {
        assert_ne!(bytes(32).unwrap(), bytes(32).unwrap());
    }
}
