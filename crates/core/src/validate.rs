//! Input validation boundary.
//!
//! Every user-supplied identifier or argument passes through here before an
//! argv vector is built. The CLI is always invoked without a shell, so these
//! checks exist to reject structurally invalid input early with actionable
//! messages, not to prevent shell injection, which is impossible by
//! construction.

use std::collections::HashMap;

use thiserror::Error;
use tracing::warn;

use crate::model::{MountPoint, PortMapping};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid {kind} name '{value}': must start with an alphanumeric and contain only [A-Za-z0-9_.-], max 255 chars")]
    BadName { kind: String, value: String },
    #[error("invalid image reference '{0}'")]
    BadImageRef(String),
    #[error("invalid port mapping '{value}': {reason}")]
    BadPortMapping { value: String, reason: String },
    #[error("invalid volume mount '{value}': {reason}")]
    BadVolumeMount { value: String, reason: String },
    #[error("invalid environment variable name '{0}'")]
    BadEnvKey(String),
}

/// Shell metacharacters rejected in mount paths and stripped by
/// [`sanitize_shell_arg`].
pub const SHELL_BLACKLIST: &[char] = &[
    ';', '|', '&', '$', '`', '\\', '<', '>', '(', ')', '{', '}', '[', ']', '!', '#', '*', '?', '~',
];

/// Registry hosts we recognize. Anything else is allowed but logged, so a
/// typo'd private registry shows up in diagnostics.
const KNOWN_REGISTRIES: &[&str] = &[
    "docker.io",
    "registry.hub.docker.com",
    "ghcr.io",
    "quay.io",
    "mcr.microsoft.com",
    "public.ecr.aws",
];

fn contains_blacklisted(s: &str) -> bool {
    s.chars().any(|c| SHELL_BLACKLIST.contains(&c))
}

/// Validate a resource name: `^[A-Za-z0-9][A-Za-z0-9_.-]{0,254}$`.
pub fn validate_name(name: &str, kind: &str) -> Result<(), ValidationError> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            name.len() <= 255
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        }
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::BadName {
            kind: kind.to_string(),
            value: name.to_string(),
        })
    }
}

/// Container ids follow the same grammar as names (the CLI accepts either).
pub fn validate_container_id(id: &str) -> Result<(), ValidationError> {
    validate_name(id, "container id")
}

fn valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() || first == '_' => {
            tag.len() <= 128
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
        }
        _ => false,
    }
}

fn valid_repo_component(component: &str) -> bool {
    !component.is_empty()
        && component
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':'))
}

/// Validate an image reference: `repository[:tag][@sha256:<64-hex>]`.
///
/// An unrecognized registry host warns but does not block; private
/// registries are legitimate.
pub fn validate_image_ref(reference: &str) -> Result<(), ValidationError> {
    if reference.is_empty() {
        return Err(ValidationError::BadImageRef(reference.to_string()));
    }

    // Split off an optional digest first.
    let (name_part, digest) = match reference.rsplit_once('@') {
        Some((name, digest)) => (name, Some(digest)),
        None => (reference, None),
    };
    if let Some(digest) = digest {
        let hex = match digest.strip_prefix("sha256:") {
            Some(hex) => hex,
            None => return Err(ValidationError::BadImageRef(reference.to_string())),
        };
        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::BadImageRef(reference.to_string()));
        }
    }

    // A ':' after the last '/' separates the tag from the repository.
    let (repo, tag) = match name_part.rsplit_once(':') {
        Some((repo, tag)) if !tag.contains('/') => (repo, Some(tag)),
        _ => (name_part, None),
    };
    if repo.is_empty() {
        return Err(ValidationError::BadImageRef(reference.to_string()));
    }
    if let Some(tag) = tag {
        if !valid_tag(tag) {
            return Err(ValidationError::BadImageRef(reference.to_string()));
        }
    }
    if !repo.split('/').all(valid_repo_component) {
        return Err(ValidationError::BadImageRef(reference.to_string()));
    }

    // First component with a dot or port is a registry host.
    if let Some((host, _)) = repo.split_once('/') {
        if (host.contains('.') || host.contains(':'))
            && !KNOWN_REGISTRIES.contains(&host.split(':').next().unwrap_or(host))
        {
            warn!(registry = host, reference, "image reference uses an unrecognized registry");
        }
    }

    Ok(())
}

fn parse_port(value: &str, raw: &str) -> Result<u16, ValidationError> {
    let port: u32 = value.parse().map_err(|_| ValidationError::BadPortMapping {
        value: raw.to_string(),
        reason: format!("'{}' is not a number", value),
    })?;
    if port == 0 || port > 65535 {
        return Err(ValidationError::BadPortMapping {
            value: raw.to_string(),
            reason: format!("port {} out of range 1-65535", port),
        });
    }
    Ok(port as u16)
}

/// Validate and parse `host:container[/tcp|udp]`.
pub fn validate_port_mapping(mapping: &str) -> Result<PortMapping, ValidationError> {
    let (ports, protocol) = match mapping.rsplit_once('/') {
        Some((ports, proto)) => {
            if proto != "tcp" && proto != "udp" {
                return Err(ValidationError::BadPortMapping {
                    value: mapping.to_string(),
                    reason: format!("unknown protocol '{}'", proto),
                });
            }
            (ports, proto)
        }
        None => (mapping, "tcp"),
    };

    let (host, container) = ports.split_once(':').ok_or_else(|| ValidationError::BadPortMapping {
        value: mapping.to_string(),
        reason: "expected host:container".to_string(),
    })?;

    Ok(PortMapping {
        host_port: parse_port(host, mapping)?,
        container_port: parse_port(container, mapping)?,
        protocol: protocol.to_string(),
    })
}

/// Validate and parse `source:target[:ro]`.
pub fn validate_volume_mount(mount: &str) -> Result<MountPoint, ValidationError> {
    let mut parts = mount.split(':');
    let source = parts.next().unwrap_or_default();
    let target = parts.next().ok_or_else(|| ValidationError::BadVolumeMount {
        value: mount.to_string(),
        reason: "expected source:target".to_string(),
    })?;
    let read_only = match parts.next() {
        None => false,
        Some("ro") => true,
        Some(other) => {
            return Err(ValidationError::BadVolumeMount {
                value: mount.to_string(),
                reason: format!("unknown mount option '{}'", other),
            })
        }
    };
    if parts.next().is_some() {
        return Err(ValidationError::BadVolumeMount {
            value: mount.to_string(),
            reason: "too many ':' separators".to_string(),
        });
    }
    if source.is_empty() || target.is_empty() {
        return Err(ValidationError::BadVolumeMount {
            value: mount.to_string(),
            reason: "source and target must be non-empty".to_string(),
        });
    }
    if contains_blacklisted(source) || contains_blacklisted(target) {
        return Err(ValidationError::BadVolumeMount {
            value: mount.to_string(),
            reason: "path contains shell metacharacters".to_string(),
        });
    }

    Ok(MountPoint {
        source: source.to_string(),
        target: target.to_string(),
        read_only,
    })
}

/// Validate environment variable names: `^[A-Za-z_][A-Za-z0-9_]*$`.
///
/// Values containing blacklisted characters are allowed (they are common in
/// real configs) but flagged in the log.
pub fn validate_env_vars(vars: &HashMap<String, String>) -> Result<(), ValidationError> {
    for (key, value) in vars {
        let mut chars = key.chars();
        let key_ok = match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        };
        if !key_ok {
            return Err(ValidationError::BadEnvKey(key.clone()));
        }
        if contains_blacklisted(value) {
            warn!(key, "environment value contains shell metacharacters");
        }
    }
    Ok(())
}

/// Strip blacklisted characters from an argument.
///
/// Secondary layer only: the client never invokes a shell, so this is not
/// load-bearing for injection safety.
pub fn sanitize_shell_arg(arg: &str) -> String {
    arg.chars().filter(|c| !SHELL_BLACKLIST.contains(c)).collect()
}
