use rand::distributions::Alphanumeric;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Length of generated class suffixes and preview ids
pub const ID_LENGTH: usize = 6;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const NONCE_LENGTH: usize = 22;

/// Source of class-name suffixes and preview ids.
///
/// Passed explicitly to each render so tests can inject a fixed sequence
/// and concurrent renders never share generator state.
pub trait IdGenerator {
    /// Next token of [`ID_LENGTH`] ASCII letters
    fn next_id(&mut self) -> String;
}

/// Random tokens from a per-render RNG
#[derive(Debug)]
pub struct RandomIds {
    rng: StdRng,
}

impl RandomIds {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> String {
        (0..ID_LENGTH)
            .map(|_| LETTERS[self.rng.gen_range(0..LETTERS.len())] as char)
            .collect()
    }
}

/// Deterministic tokens: `aaaaaa`, `aaaaab`, `aaaaac`, …
#[derive(Debug, Default)]
pub struct SequentialIds {
    counter: u64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(counter: u64) -> Self {
        Self { counter }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let base = LETTERS.len() as u64;
        let mut n = self.counter;
        self.counter += 1;
        let mut out = [b'a'; ID_LENGTH];
        for slot in out.iter_mut().rev() {
            *slot = LETTERS[(n % base) as usize];
            n /= base;
        }
        out.iter().map(|&b| b as char).collect()
    }
}

/// A fresh nonce for one response's Content-Security-Policy header
pub fn nonce() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LENGTH)
        .map(char::from)
        .collect()
}

/// Whether `s` could have come from an [`IdGenerator`]
pub fn is_id_token(s: &str) -> bool {
    s.len() == ID_LENGTH && s.bytes().all(|b| b.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_use_letters_only() {
        let mut ids = RandomIds::new();
        for _ in 0..100 {
            assert!(is_id_token(&ids.next_id()));
        }
    }

    #[test]
    fn test_seeded_ids_repeat() {
        let mut a = RandomIds::seeded(7);
        let mut b = RandomIds::seeded(7);
        assert_eq!(a.next_id(), b.next_id());
        assert_eq!(a.next_id(), b.next_id());
    }

    #[test]
    fn test_sequential_ids() {
        let mut ids = SequentialIds::new();
        assert_eq!(ids.next_id(), "aaaaaa");
        assert_eq!(ids.next_id(), "aaaaab");
        let mut ids = SequentialIds::starting_at(52);
        assert_eq!(ids.next_id(), "aaaaba");
        assert_eq!(ids.next_id(), "aaaabb");
    }

    #[test]
    fn test_nonce_shape() {
        let n = nonce();
        assert_eq!(n.len(), 22);
        assert!(n.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(n, nonce());
    }
}
