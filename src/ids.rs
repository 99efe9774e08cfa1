//! Identifier generation.
//!
//! Two kinds of ids are minted while resolving overrides:
//! - adjusted extension ids: `<base>.<token>` (or `<stem>.<token>_<version>`
//!   when the base carries a version suffix), where the token comes from an
//!   injected [`IdGenerator`];
//! - project child ids: `<ancestor>.<n>` where `n` is derived from a SHA-256
//!   digest of the owner and ancestor ids, so reloading the same graph
//!   yields the same ids.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex_lite::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Source of numeric tokens for adjusted extension ids.
pub trait IdGenerator: Send {
    /// Next token for an id derived from `base_id`.
    fn next_token(&mut self, base_id: &str) -> u64;
}

/// Monotonic counter.
#[derive(Debug, Clone)]
pub struct CounterIdGenerator {
    next: u64,
}

impl CounterIdGenerator {
    pub fn new(start: u64) -> Self {
        Self { next: start }
    }
}

impl Default for CounterIdGenerator {
    fn default() -> Self {
        Self::new(1)
    }
}

impl IdGenerator for CounterIdGenerator {
    fn next_token(&mut self, _base_id: &str) -> u64 {
        let token = self.next;
        self.next += 1;
        token
    }
}

/// Content-derived tokens: SHA-256 over (salt, base id, sequence).
#[derive(Debug, Clone)]
pub struct HashIdGenerator {
    salt: String,
    sequence: u64,
}

impl HashIdGenerator {
    pub fn new(salt: impl Into<String>) -> Self {
        Self {
            salt: salt.into(),
            sequence: 0,
        }
    }
}

impl IdGenerator for HashIdGenerator {
    fn next_token(&mut self, base_id: &str) -> u64 {
        let token = digest_number(&[&self.salt, base_id, &self.sequence.to_string()]);
        self.sequence += 1;
        token
    }
}

/// Random tokens, seedable for reproducible runs.
pub struct RandomIdGenerator {
    rng: StdRng,
}

impl RandomIdGenerator {
    pub fn from_entropy() -> Self {
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

impl IdGenerator for RandomIdGenerator {
    fn next_token(&mut self, _base_id: &str) -> u64 {
        self.rng.gen_range(0..u64::from(u32::MAX))
    }
}

fn version_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+)_(\d+\.\d+\.\d+)$").expect("static regex"))
}

/// Split a trailing `_<major>.<minor>.<micro>` version off an id.
pub fn split_version(id: &str) -> (&str, Option<&str>) {
    match version_regex().captures(id) {
        Some(caps) => {
            let stem = caps.get(1).map(|m| m.as_str()).unwrap_or(id);
            let version = caps.get(2).map(|m| m.as_str());
            (stem, version)
        }
        None => (id, None),
    }
}

/// Id of an adjusted extension element derived from `base_id`.
///
/// The version suffix, if any, is moved after the token so that version
/// parsing of the new id still works.
pub fn adjusted_id(base_id: &str, token: u64) -> String {
    match split_version(base_id) {
        (stem, Some(version)) => format!("{}.{}_{}", stem, token, version),
        (_, None) => format!("{}.{}", base_id, token),
    }
}

/// Deterministic candidate for a project child id.
///
/// `attempt` is bumped by the caller until the candidate is unused.
pub fn child_id(ancestor_id: &str, owner_id: &str, attempt: u32) -> String {
    let n = digest_number(&[owner_id, ancestor_id, &attempt.to_string()]);
    format!("{}.{}", ancestor_id, n % 1_000_000_000)
}

fn digest_number(parts: &[&str]) -> u64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&digest[..4]);
    u64::from(u32::from_be_bytes(bytes))
}

/// Short hex digest, used for configuration fingerprints.
pub fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(&digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_version() {
        assert_eq!(
            split_version("gnu.c.compiler_1.2.3"),
            ("gnu.c.compiler", Some("1.2.3"))
        );
        assert_eq!(split_version("gnu.c.compiler"), ("gnu.c.compiler", None));
        assert_eq!(split_version("gnu_c_compiler"), ("gnu_c_compiler", None));
    }

    #[test]
    fn test_adjusted_id_keeps_version_last() {
        assert_eq!(adjusted_id("gnu.opt_2.0.0", 42), "gnu.opt.42_2.0.0");
        assert_eq!(adjusted_id("gnu.opt", 42), "gnu.opt.42");

        let adjusted = adjusted_id("gnu.opt_2.0.0", 7);
        let (_, version) = split_version(&adjusted);
        assert_eq!(version, Some("2.0.0"));
    }

    #[test]
    fn test_child_id_is_deterministic() {
        let a = child_id("gnu.c.compiler", "cfg.debug", 0);
        let b = child_id("gnu.c.compiler", "cfg.debug", 0);
        assert_eq!(a, b);
        assert!(a.starts_with("gnu.c.compiler."));

        assert_ne!(a, child_id("gnu.c.compiler", "cfg.release", 0));
        assert_ne!(a, child_id("gnu.c.compiler", "cfg.debug", 1));
    }

    #[test]
    fn test_counter_generator() {
        let mut gen = CounterIdGenerator::new(5);
        assert_eq!(gen.next_token("x"), 5);
        assert_eq!(gen.next_token("y"), 6);
    }

    #[test]
    fn test_hash_generator_is_reproducible() {
        let mut a = HashIdGenerator::new("salt");
        let mut b = HashIdGenerator::new("salt");
        let first = a.next_token("base");
        assert_eq!(first, b.next_token("base"));
        assert_ne!(first, a.next_token("base"));
    }

    #[test]
    fn test_seeded_random_generator() {
        let mut a = RandomIdGenerator::seeded(9);
        let mut b = RandomIdGenerator::seeded(9);
        assert_eq!(a.next_token("x"), b.next_token("x"));
    }

    #[test]
    fn test_short_digest_length() {
        assert_eq!(short_digest("cfg").len(), 16);
    }
}
