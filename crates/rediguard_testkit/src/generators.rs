//! Property-based test generators using proptest.
//!
//! Provides strategies for key names, prefixes and storable values.

use proptest::prelude::*;
use rediguard_core::Value;

/// Strategy for logical key names, including separators store users
/// commonly put in keys.
pub fn key_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_:.-]{1,24}").expect("Invalid regex")
}

/// Strategy for key prefixes in the bootstrap shape: six hex characters
/// and an underscore.
pub fn prefix_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[0-9a-f]{6}_").expect("Invalid regex")
}

/// Strategy for lock names.
pub fn lock_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for values stored in plain form.
pub fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        prop::string::string_regex("[a-zA-Z0-9 ]{0,32}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
    ]
}

/// Strategy for arbitrary values, nesting arrays and text-keyed maps.
///
/// Floats are kept to finite values of moderate magnitude so they survive
/// serialization unchanged.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9f64..1.0e9).prop_map(Value::Float),
        prop::string::string_regex("[a-z]{0,12}")
            .expect("Invalid regex")
            .prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..16).prop_map(Value::Bytes),
    ];
    leaf.prop_recursive(3, 32, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec(
                (
                    prop::string::string_regex("[a-z]{1,8}").expect("Invalid regex"),
                    inner
                ),
                0..6
            )
            .prop_map(|pairs: Vec<(String, Value)>| Value::map(pairs)),
        ]
    })
}

/// Strategy for composite values only.
pub fn composite_value_strategy() -> impl Strategy<Value = Value> {
    value_strategy().prop_filter("composite values only", |v| !v.is_scalar())
}
