//! ULID identifiers for processes and ranking runs.
//!
//! The process id is fixed at first access and stamped on startup logs.
//! Each `rank_matches` call takes a fresh id from [`generate`] so that every
//! log line of one ranking (fallbacks, excluded candidates, timing) can be
//! grouped, and the id is returned to API callers.

use once_cell::sync::Lazy;
use ulid::Ulid;

static PROCESS_RUN_ID: Lazy<String> = Lazy::new(|| Ulid::new().to_string());

/// Process-wide id, stable for the lifetime of the binary.
#[inline]
pub fn get() -> &'static str {
    &PROCESS_RUN_ID
}

/// Fresh time-ordered id (26 chars, URL-safe).
#[inline]
pub fn generate() -> String {
    Ulid::new().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_id_is_stable() {
        assert_eq!(get(), get());
        assert_eq!(get().len(), 26);
    }

    #[test]
    fn generated_ids_are_unique_and_sortable() {
        let older = generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let newer = generate();
        assert_ne!(older, newer);
        assert!(older < newer);
    }
}
