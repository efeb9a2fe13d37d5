//! Local peer name resolution.
//!
//! The spawn roll compares names, so a peer that cannot find a real name for
//! itself refuses to start rather than guessing one the other side may share.

use std::{fmt, fs, process::Command};

use duel_shared::net::PeerIdentity;

/// No usable local name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// Nothing configured and the machine name could not be read.
    Unresolved,
    /// The machine name is a placeholder every computer shares.
    Placeholder(String),
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityError::Unresolved => {
                write!(f, "could not determine this computer's name; pass --name <ID>")
            }
            IdentityError::Placeholder(name) => {
                write!(f, "computer name {name:?} is not unique; pass --name <ID>")
            }
        }
    }
}

impl std::error::Error for IdentityError {}

fn non_empty(raw: String) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Best-effort lookup of the operating system's host name.
pub fn machine_name() -> Option<String> {
    let from_env = ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().and_then(non_empty));
    if from_env.is_some() {
        return from_env;
    }
    if let Some(name) = fs::read_to_string("/etc/hostname").ok().and_then(non_empty) {
        return Some(name);
    }
    let out = Command::new("hostname").output().ok()?;
    if !out.status.success() {
        return None;
    }
    String::from_utf8(out.stdout).ok().and_then(non_empty)
}

/// A configured name wins; otherwise the machine name is used when it is a
/// real one.
pub fn resolve_local_identity(
    configured: &str,
    machine: Option<String>,
) -> Result<PeerIdentity, IdentityError> {
    if !configured.trim().is_empty() {
        return Ok(PeerIdentity::new(configured));
    }
    let name = machine.and_then(non_empty).ok_or(IdentityError::Unresolved)?;
    if name.eq_ignore_ascii_case("localhost") || name.eq_ignore_ascii_case("localhost.localdomain") {
        return Err(IdentityError::Placeholder(name));
    }
    Ok(PeerIdentity::new(&name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use duel_shared::{config::SpawnConfig, link::assign_spawns};

    #[test]
    fn configured_name_wins() {
        let id = resolve_local_identity(" lab-2 ", Some("desk".into())).unwrap();
        assert_eq!(id.as_str(), "LAB-2");
    }

    #[test]
    fn machine_name_is_canonical() {
        let id = resolve_local_identity("", Some("desk-7\n".into())).unwrap();
        assert_eq!(id.as_str(), "DESK-7");
    }

    #[test]
    fn missing_or_placeholder_name_is_refused() {
        assert_eq!(resolve_local_identity("", None), Err(IdentityError::Unresolved));
        assert_eq!(resolve_local_identity("  ", Some("   ".into())), Err(IdentityError::Unresolved));
        let err = resolve_local_identity("", Some("LocalHost".into())).unwrap_err();
        assert!(matches!(err, IdentityError::Placeholder(_)));
        assert!(err.to_string().contains("--name"));
    }

    #[test]
    fn two_named_machines_get_disjoint_spawns() {
        let spawns = SpawnConfig::default();
        let box1 = resolve_local_identity("", Some("box1".into())).unwrap();
        let box2 = resolve_local_identity("", Some("box2".into())).unwrap();

        let on_box1 = assign_spawns(&box1, &box2, None, &spawns).unwrap();
        let on_box2 = assign_spawns(&box2, &box1, None, &spawns).unwrap();
        assert_ne!(on_box1.local, on_box2.local);
        assert_eq!(on_box1.local, on_box2.remote);
        assert_eq!(on_box2.local, on_box1.remote);
    }

    #[test]
    fn machine_name_is_trimmed_when_found() {
        if let Some(name) = machine_name() {
            assert!(!name.is_empty());
            assert_eq!(name, name.trim());
        }
    }
}
