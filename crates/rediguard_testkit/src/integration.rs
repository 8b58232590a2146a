//! Cross-crate integration test helpers.
//!
//! Provides a harness that mirrors every write in a local model and checks
//! the store against it, plus the end-to-end usage walkthrough.

use crate::fixtures::TestClient;
use rediguard_core::{Client, CoreResult, Value};
use std::collections::HashMap;

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The client under test.
    pub client: TestClient,
    /// Expected values by logical name.
    expected: HashMap<String, Value>,
}

impl IntegrationHarness {
    /// Creates a new integration harness with an in-memory store.
    pub fn new() -> Self {
        Self {
            client: TestClient::new(),
            expected: HashMap::new(),
        }
    }

    /// Stores a value and tracks it for later verification.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        self.client
            .set(name, value.clone(), Some(0))
            .expect("Failed to set value");
        self.expected.insert(name.to_string(), value);
    }

    /// Reads a value and checks it matches the tracked one.
    pub fn get_and_verify(&self, name: &str) -> Option<Value> {
        let actual = self.client.get_opt(name).expect("Failed to get value");
        if let Some(expected) = self.expected.get(name) {
            let actual = actual.as_ref().map(normalize);
            assert_eq!(
                actual,
                Some(normalize(expected)),
                "value mismatch for {name}"
            );
        }
        actual
    }

    /// Deletes a value and updates tracking.
    pub fn delete(&mut self, name: &str) {
        self.client.del(name).expect("Failed to delete value");
        self.expected.remove(name);
    }

    /// Verifies every tracked value and that no untracked key exists under
    /// the prefix.
    pub fn verify_all(&self) {
        for name in self.expected.keys() {
            self.get_and_verify(name);
        }
        let prefix = self.client.config().prefix.clone();
        let mut stored: Vec<_> = self
            .client
            .keys(false)
            .expect("Failed to list keys")
            .into_iter()
            .map(|k| k[prefix.len()..].to_string())
            .collect();
        stored.sort();
        let mut tracked: Vec<_> = self.expected.keys().cloned().collect();
        tracked.sort();
        assert_eq!(stored, tracked, "stored keys differ from tracked keys");
    }

    /// Returns the count of tracked values.
    pub fn tracked_count(&self) -> usize {
        self.expected.len()
    }
}

impl Default for IntegrationHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Scalars come back as text; compare them in that form.
fn normalize(value: &Value) -> Value {
    match value {
        Value::Integer(n) => Value::Text(n.to_string()),
        Value::Float(f) => Value::Text(f.to_string()),
        Value::Bool(b) => Value::Text(if *b { "1" } else { "0" }.to_string()),
        other => other.clone(),
    }
}

/// Results of [`run_walkthrough`], one field per step worth asserting.
#[derive(Debug, Clone, PartialEq)]
pub struct Walkthrough {
    /// `get("name", "default")` after storing `zhangsan`.
    pub name: Value,
    /// `set_nx("exist", "yes")` on a fresh store.
    pub set_nx_fresh: bool,
    /// `del("age")` on a missing key.
    pub del_missing: u64,
    /// `get("age", 20)` on a missing key.
    pub age_default: Value,
    /// `inc("money", 5)` from 100.
    pub money_after_inc: i64,
    /// `dec("money", 5)` back down.
    pub money_after_dec: i64,
    /// `llen` after push then pop.
    pub list_len_after_pop: u64,
    /// `lpop` of the pushed element.
    pub popped: Option<Value>,
    /// `lrange("hobby", 2, 100)` of a five-element list.
    pub range_tail: Vec<Value>,
    /// Four lock steps: lock, lock again, unlock, lock.
    pub lock_steps: [bool; 4],
}

/// Runs the everyday usage sequence: strings, counters, lists, key listing
/// and the lock cycle.
///
/// # Errors
///
/// Propagates the first client error.
pub fn run_walkthrough(client: &Client) -> CoreResult<Walkthrough> {
    client.set("name", "zhangsan", None)?;
    let name = client.get("name", "default")?;
    let set_nx_fresh = client.set_nx("exist", "yes")?;
    let del_missing = client.del("age")?;
    let age_default = client.get("age", 20i64)?;

    client.set("money", 100i64, None)?;
    let money_after_inc = client.inc("money", 5)?;
    let money_after_dec = client.dec("money", 5)?;

    client.del("hobby")?;
    client.lpush("hobby", "Basketball")?;
    let popped = client.lpop("hobby")?;
    let list_len_after_pop = client.llen("hobby")?;

    for hobby in ["Basketball", "football", "golf", "ping-pong", "coding"] {
        client.rpush("hobby", hobby)?;
    }
    let range_tail = client.lrange("hobby", 2, 100)?;

    // Listing must succeed with mixed value kinds present.
    client.keys(false)?;
    client.all_data(false)?;

    let lock_steps = [
        client.lock("foo", 10)?,
        client.lock("foo", 10)?,
        client.unlock("foo")?,
        client.lock("foo", 10)?,
    ];

    Ok(Walkthrough {
        name,
        set_nx_fresh,
        del_missing,
        age_default,
        money_after_inc,
        money_after_dec,
        list_len_after_pop,
        popped,
        range_tail,
        lock_steps,
    })
}
