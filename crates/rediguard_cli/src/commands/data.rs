//! Key and value commands.

use super::{display_value, json_to_value, value_to_json, CommandResult};
use rediguard_core::{Client, Value};
use serde_json::Map;
use std::io::Write;

/// Prints the value of `name`, or nothing if absent.
pub fn get(client: &Client, name: &str, out: &mut dyn Write) -> CommandResult {
    match client.get_opt(name)? {
        Some(value) => writeln!(out, "{}", display_value(&value))?,
        None => writeln!(out, "(nil)")?,
    }
    Ok(())
}

/// Stores `raw` under `name`, parsing it as JSON when `json` is set.
pub fn set(
    client: &Client,
    name: &str,
    raw: &str,
    ttl: Option<u64>,
    json: bool,
    out: &mut dyn Write,
) -> CommandResult {
    let value = if json {
        json_to_value(&serde_json::from_str(raw)?)
    } else {
        Value::from(raw)
    };
    client.set(name, value, ttl)?;
    writeln!(out, "OK")?;
    Ok(())
}

/// Deletes `name`.
pub fn del(client: &Client, name: &str, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", client.del(name)?)?;
    Ok(())
}

/// Adds `delta` to `name`.
pub fn inc(client: &Client, name: &str, delta: i64, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", client.inc(name, delta)?)?;
    Ok(())
}

/// Subtracts `delta` from `name`.
pub fn dec(client: &Client, name: &str, delta: i64, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", client.dec(name, delta)?)?;
    Ok(())
}

/// Lists physical keys.
pub fn keys(client: &Client, all: bool, out: &mut dyn Write) -> CommandResult {
    for key in client.keys(all)? {
        writeln!(out, "{key}")?;
    }
    Ok(())
}

/// Prints every key with its value.
pub fn dump(client: &Client, all: bool, format: &str, out: &mut dyn Write) -> CommandResult {
    let data = client.all_data(all)?;
    match format {
        "json" => {
            let map: Map<String, serde_json::Value> = data
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect();
            writeln!(out, "{}", serde_json::to_string_pretty(&map)?)?;
        }
        "text" => {
            for (key, value) in &data {
                writeln!(out, "{key} = {}", display_value(value))?;
            }
        }
        other => return Err(format!("unknown format: {other}").into()),
    }
    Ok(())
}

/// Deletes every key listed in the set `set_name`.
pub fn del_by_set(client: &Client, set_name: &str, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", client.del_by_set(set_name)?)?;
    Ok(())
}

/// Deletes every key under the prefix, or every key with `all`.
pub fn del_all(client: &Client, all: bool, out: &mut dyn Write) -> CommandResult {
    writeln!(out, "{}", client.del_all(all)?)?;
    Ok(())
}
