//! Round-robin credential pool.
//!
//! Every logical request claims the next credential in a wrap-around
//! sequence. The cursor is the only shared mutable state in the fetch layer
//! and advances through a single atomic read-modify-write, so concurrent
//! callers never skip or double-claim a slot.

use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, instrument};

use super::FetchError;

/// One API token, pre-rendered as a sensitive `Authorization` header value.
#[derive(Debug)]
pub struct Credential {
    index: usize,
    header: HeaderValue,
}

impl Credential {
    fn new(index: usize, token: &SecretString) -> Result<Self, FetchError> {
        let raw = token.expose_secret().trim();
        if raw.is_empty() {
            return Err(FetchError::InvalidCredential { index });
        }
        let mut header = HeaderValue::from_str(&format!("token {raw}"))
            .map_err(|_| FetchError::InvalidCredential { index })?;
        header.set_sensitive(true);
        Ok(Self { index, header })
    }

    /// Position of this credential in its pool (safe to log).
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The `Authorization` header value for this credential.
    #[must_use]
    pub fn authorization(&self) -> &HeaderValue {
        &self.header
    }
}

/// Ordered, non-empty set of credentials rotated round-robin.
#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Builds a pool from API tokens, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::EmptyCredentialPool`] when no tokens are given and
    /// [`FetchError::InvalidCredential`] when a token is blank or cannot be
    /// sent as a header.
    #[instrument(skip_all)]
    pub fn new<I>(tokens: I) -> Result<Self, FetchError>
    where
        I: IntoIterator<Item = SecretString>,
    {
        let credentials = tokens
            .into_iter()
            .enumerate()
            .map(|(index, token)| Credential::new(index, &token))
            .collect::<Result<Vec<_>, _>>()?;

        if credentials.is_empty() {
            return Err(FetchError::EmptyCredentialPool);
        }

        debug!(size = credentials.len(), "credential pool ready");
        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of credentials in the pool.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Always `false`; construction rejects empty pools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Claims the next credential in rotation.
    pub fn claim(&self) -> &Credential {
        let len = self.credentials.len();
        let (Ok(slot) | Err(slot)) =
            self.cursor
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                    Some((current + 1) % len)
                });
        &self.credentials[slot]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;

    fn pool(tokens: &[&str]) -> Result<CredentialPool, FetchError> {
        CredentialPool::new(tokens.iter().map(|t| SecretString::new((*t).to_string())))
    }

    // ==================== Construction Tests ====================

    #[test]
    fn test_empty_pool_is_rejected() {
        assert!(matches!(pool(&[]), Err(FetchError::EmptyCredentialPool)));
    }

    #[test]
    fn test_blank_token_is_rejected_with_index() {
        let result = pool(&["abc", "   "]);
        assert!(matches!(
            result,
            Err(FetchError::InvalidCredential { index: 1 })
        ));
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        let result = pool(&["abc\ndef"]);
        assert!(matches!(
            result,
            Err(FetchError::InvalidCredential { index: 0 })
        ));
    }

    #[test]
    fn test_authorization_header_format_and_sensitivity() {
        let pool = pool(&["ghp_secret"]).unwrap();
        let header = pool.claim().authorization();
        assert_eq!(header.to_str().unwrap(), "token ghp_secret");
        assert!(header.is_sensitive());
    }

    #[test]
    fn test_debug_output_hides_token() {
        let pool = pool(&["ghp_supersecret"]).unwrap();
        let rendered = format!("{pool:?}");
        assert!(!rendered.contains("ghp_supersecret"), "leaked: {rendered}");
    }

    // ==================== Rotation Tests ====================

    #[test]
    fn test_rotation_is_round_robin_and_wraps() {
        let pool = pool(&["a", "b", "c"]).unwrap();
        let order: Vec<usize> = (0..7).map(|_| pool.claim().index()).collect();
        assert_eq!(order, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn test_single_credential_always_claimed() {
        let pool = pool(&["only"]).unwrap();
        for _ in 0..5 {
            assert_eq!(pool.claim().index(), 0);
        }
    }

    #[test]
    fn test_concurrent_claims_are_uniform() {
        const THREADS: usize = 8;
        const CLAIMS_PER_THREAD: usize = 300;
        let pool = Arc::new(pool(&["a", "b", "c", "d"]).unwrap());

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    (0..CLAIMS_PER_THREAD)
                        .map(|_| pool.claim().index())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts: HashMap<usize, usize> = HashMap::new();
        for handle in handles {
            for index in handle.join().unwrap() {
                *counts.entry(index).or_default() += 1;
            }
        }

        // 2400 claims over 4 credentials: every slot is claimed exactly 600 times.
        assert_eq!(counts.len(), 4);
        for count in counts.values() {
            assert_eq!(*count, THREADS * CLAIMS_PER_THREAD / 4);
        }
    }
}
