//! Logical-to-physical key mapping.

const LOCK_NAMESPACE: &str = "lock:";
const LOCK_SET_NAME: &str = "all_locks";
const SWEEP_GUARD: &str = "lock_sweep_guard";

/// Maps logical names to namespaced store keys.
///
/// The mapping is plain concatenation: `physical(name) == prefix + name`.
/// For a fixed prefix it is injective, so distinct names never share a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCodec {
    prefix: String,
}

impl KeyCodec {
    /// Creates a codec for `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The configured prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Physical key for a logical name.
    pub fn physical(&self, name: &str) -> String {
        let mut key = String::with_capacity(self.prefix.len() + name.len());
        key.push_str(&self.prefix);
        key.push_str(name);
        key
    }

    /// Logical name for a physical key, if it carries this prefix.
    pub fn logical<'a>(&self, physical: &'a str) -> Option<&'a str> {
        physical.strip_prefix(self.prefix.as_str())
    }

    /// Physical key of the lock record for `name`.
    pub fn lock_key(&self, name: &str) -> String {
        self.physical(&format!("{LOCK_NAMESPACE}{name}"))
    }

    /// Physical key of the set tracking every lock name.
    ///
    /// It shares the lock namespace, so `all_locks` cannot name a lock.
    pub fn lock_set(&self) -> String {
        self.lock_key(LOCK_SET_NAME)
    }

    /// Returns true if `name` would collide with the tracking set.
    pub fn is_reserved_lock_name(name: &str) -> bool {
        name == LOCK_SET_NAME
    }

    /// Physical key of the sweep cooldown sentinel, outside the lock
    /// namespace.
    pub fn sweep_guard(&self) -> String {
        self.physical(SWEEP_GUARD)
    }

    /// Glob selecting this prefix's keys, or every key when `all` is set.
    pub fn pattern(&self, all: bool) -> String {
        if all {
            "*".to_string()
        } else {
            self.physical("*")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn physical_is_prefix_concatenation() {
        let keys = KeyCodec::new("a1b2c3_");
        assert_eq!(keys.physical("name"), "a1b2c3_name");
        assert_eq!(keys.lock_key("foo"), "a1b2c3_lock:foo");
        assert_eq!(keys.lock_set(), "a1b2c3_lock:all_locks");
        assert_eq!(keys.sweep_guard(), "a1b2c3_lock_sweep_guard");
    }

    #[test]
    fn bookkeeping_keys_stay_clear_of_lock_records() {
        let keys = KeyCodec::new("p_");
        assert_ne!(keys.lock_key("sweep_guard"), keys.sweep_guard());
        assert_eq!(keys.lock_key("all_locks"), keys.lock_set());
        assert!(KeyCodec::is_reserved_lock_name("all_locks"));
        assert!(!KeyCodec::is_reserved_lock_name("sweep_guard"));
    }

    #[test]
    fn pattern_respects_all_flag() {
        let keys = KeyCodec::new("p_");
        assert_eq!(keys.pattern(false), "p_*");
        assert_eq!(keys.pattern(true), "*");
    }

    #[test]
    fn logical_strips_prefix() {
        let keys = KeyCodec::new("p_");
        assert_eq!(keys.logical("p_money"), Some("money"));
        assert_eq!(keys.logical("q_money"), None);
    }

    proptest! {
        #[test]
        fn distinct_names_map_to_distinct_keys(
            prefix in "[a-f0-9]{6}_",
            a in "\\PC{0,24}",
            b in "\\PC{0,24}",
        ) {
            prop_assume!(a != b);
            let keys = KeyCodec::new(prefix);
            prop_assert_ne!(keys.physical(&a), keys.physical(&b));
        }

        #[test]
        fn logical_inverts_physical(prefix in "[a-z]{0,8}", name in "\\PC{0,24}") {
            let keys = KeyCodec::new(prefix);
            let physical = keys.physical(&name);
            prop_assert_eq!(keys.logical(&physical), Some(name.as_str()));
        }
    }
}
