//! Environment variable overrides (`spec.md` §6).

use std::env;

/// `AIMO_STANDARD_VERSION` — optional override, still subject to pinning
/// when it equals the compiled-in pin.
#[must_use]
pub fn standard_version_override() -> Option<String> {
    env::var("AIMO_STANDARD_VERSION").ok().filter(|v| !v.is_empty())
}

/// `AIMO_ALLOW_SKIP_PINNING ∈ {1, true, yes}` — only these values enable the
/// guarded skip (`spec.md` §6).
#[must_use]
pub fn allow_skip_pinning() -> bool {
    match env::var("AIMO_ALLOW_SKIP_PINNING") {
        Ok(v) => matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => false,
    }
}

/// `AIMO_DISABLE_LLM=1` — LLM calls must raise a dedicated disabled-error.
#[must_use]
pub fn llm_disabled() -> bool {
    env::var("AIMO_DISABLE_LLM").map(|v| v == "1").unwrap_or(false)
}

/// `AIMO_CLASSIFIER=stub` — inject the deterministic stub classifier.
#[must_use]
pub fn classifier_override() -> Option<String> {
    env::var("AIMO_CLASSIFIER").ok().filter(|v| !v.is_empty())
}

/// `SANITIZE_SALT` — required when producing sanitized CSV exports.
#[must_use]
pub fn sanitize_salt() -> Option<String> {
    env::var("SANITIZE_SALT").ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn allow_skip_pinning_accepts_only_documented_values() {
        let _guard = env_lock().lock().unwrap();
        for value in ["1", "true", "yes", "TRUE", "Yes"] {
            env::set_var("AIMO_ALLOW_SKIP_PINNING", value);
            assert!(allow_skip_pinning(), "expected {value} to enable skip");
        }
        for value in ["0", "false", "no", "2", ""] {
            env::set_var("AIMO_ALLOW_SKIP_PINNING", value);
            assert!(!allow_skip_pinning(), "expected {value} to NOT enable skip");
        }
        env::remove_var("AIMO_ALLOW_SKIP_PINNING");
        assert!(!allow_skip_pinning());
    }

    #[test]
    fn llm_disabled_requires_exact_value_1() {
        let _guard = env_lock().lock().unwrap();
        env::set_var("AIMO_DISABLE_LLM", "1");
        assert!(llm_disabled());
        env::set_var("AIMO_DISABLE_LLM", "true");
        assert!(!llm_disabled());
        env::remove_var("AIMO_DISABLE_LLM");
    }
}
