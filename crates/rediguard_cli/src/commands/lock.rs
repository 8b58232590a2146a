//! Lock commands.

use super::CommandResult;
use rediguard_core::{Client, LockState};
use std::io::Write;

/// Tries to take a lock. Prints `acquired` or `busy`.
pub fn lock(client: &Client, name: &str, ttl: Option<u64>, out: &mut dyn Write) -> CommandResult {
    let acquired = match ttl {
        Some(ttl) => client.lock(name, ttl)?,
        None => client.lock_default(name)?,
    };
    writeln!(out, "{}", if acquired { "acquired" } else { "busy" })?;
    Ok(())
}

/// Releases a lock.
pub fn unlock(client: &Client, name: &str, out: &mut dyn Write) -> CommandResult {
    client.unlock(name)?;
    writeln!(out, "released")?;
    Ok(())
}

/// Prints the state of a lock.
pub fn status(client: &Client, name: &str, out: &mut dyn Write) -> CommandResult {
    match client.lock_status(name)? {
        LockState::Free => writeln!(out, "free")?,
        LockState::Held {
            expires_at: Some(at),
        } => writeln!(out, "held until {at}")?,
        LockState::Held { expires_at: None } => writeln!(out, "held")?,
        LockState::Expired { expired_at } => writeln!(out, "expired at {expired_at}")?,
    }
    Ok(())
}

/// Reclaims stale locks.
pub fn sweep(client: &Client, out: &mut dyn Write) -> CommandResult {
    let reclaimed = client.clear_locks()?;
    writeln!(out, "reclaimed {reclaimed}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{client, output};

    #[test]
    fn lock_cycle() {
        let (_server, client) = client();
        let mut out = Vec::new();

        lock(&client, "foo", Some(10), &mut out).unwrap();
        lock(&client, "foo", Some(10), &mut out).unwrap();
        status(&client, "foo", &mut out).unwrap();
        unlock(&client, "foo", &mut out).unwrap();
        status(&client, "foo", &mut out).unwrap();
        lock(&client, "foo", None, &mut out).unwrap();

        let text = output(out);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "acquired");
        assert_eq!(lines[1], "busy");
        assert!(lines[2].starts_with("held until "));
        assert_eq!(lines[3], "released");
        assert_eq!(lines[4], "free");
        assert_eq!(lines[5], "acquired");
    }

    #[test]
    fn sweep_reports_count() {
        let (_server, client) = client();
        let mut out = Vec::new();
        sweep(&client, &mut out).unwrap();
        assert_eq!(output(out), "reclaimed 0\n");
    }
}
