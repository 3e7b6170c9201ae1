//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Longest accepted code cache window. Longer windows would outlive the
/// 30 second TOTP step the code belongs to.
const MAX_WINDOW_MS: u64 = 30_000;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("admission.totp_secret decodes to no key bytes")]
    EmptySecret,
    #[error("admission.public_key is not valid base64: {0}")]
    InvalidPublicKey(String),
    #[error("admission.window_ms must be between 1 and {MAX_WINDOW_MS}, got {0}")]
    InvalidWindow(u64),
    #[error("admission.attempts_per_minute must be at least 1")]
    InvalidAttemptRate,
    #[error("listen.trigger_socket and listen.control_socket must differ")]
    SocketCollision,
    #[error("{0} parent directory does not exist: {1}")]
    SocketDirMissing(&'static str, String),
    #[error("capability.region_size must be non-zero")]
    EmptyRegion,
    #[error("capability.max_handles_per_caller must be at least 1")]
    NoHandles,
    #[error("capability.queue_depth must be at least 1")]
    NoQueue,
    #[error("rules.max_rules must be at least 1")]
    NoRules,
    #[error("rules.allowlist has {0} entries, more than rules.max_allowlist")]
    AllowlistTooLong(usize),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    // Admission
    let admission = &config.admission;
    if admission.totp_key().is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if let Err(e) = admission.public_key_bytes() {
        errors.push(ValidationError::InvalidPublicKey(e.to_string()));
    }
    if admission.window_ms == 0 || admission.window_ms > MAX_WINDOW_MS {
        errors.push(ValidationError::InvalidWindow(admission.window_ms));
    }
    if admission.attempts_per_minute == 0 {
        errors.push(ValidationError::InvalidAttemptRate);
    }

    // Listeners
    let listen = &config.listen;
    if listen.trigger_socket == listen.control_socket {
        errors.push(ValidationError::SocketCollision);
    }
    for (name, path) in [
        ("listen.trigger_socket", &listen.trigger_socket),
        ("listen.control_socket", &listen.control_socket),
    ] {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::SocketDirMissing(
                name,
                path.display().to_string(),
            ));
        }
    }

    // Capabilities
    if config.capability.region_size == 0 {
        errors.push(ValidationError::EmptyRegion);
    }
    if config.capability.max_handles_per_caller == 0 {
        errors.push(ValidationError::NoHandles);
    }
    if config.capability.queue_depth == 0 {
        errors.push(ValidationError::NoQueue);
    }

    // Rules
    if config.rules.max_rules == 0 {
        errors.push(ValidationError::NoRules);
    }
    if config.rules.allowlist.len() > config.rules.max_allowlist {
        errors.push(ValidationError::AllowlistTooLong(
            config.rules.allowlist.len(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_valid_config() -> String {
        r#"
[listen]
trigger_socket = "/tmp/fmacd-trigger.sock"
control_socket = "/tmp/fmacd-control.sock"

[admission]
totp_secret = "P2U6KVKZKSFKXGXO7XN6S6X62X6M6NE7"
public_key = "BAECAwQ="
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        let config: Config = toml::from_str(&minimal_valid_config()).unwrap();
        assert!(validate(&config).is_ok());
        assert_eq!(config.admission.window_ms, 5000);
        assert!(!config.rules.default_deny);
        assert_eq!(config.escalation.target_label, "u:r:su:s0");
    }

    #[test]
    fn test_missing_admission_section_fails_to_parse() {
        assert!(toml::from_str::<Config>("[server]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn test_garbage_secret_fails() {
        let toml = minimal_valid_config().replace("P2U6KVKZKSFKXGXO7XN6S6X62X6M6NE7", "0189!");
        let config: Config = toml::from_str(&toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptySecret)));
    }

    #[test]
    fn test_bad_public_key_and_window_fail() {
        let toml = format!(
            "{}window_ms = 60000\n",
            minimal_valid_config().replace("BAECAwQ=", "not base64!")
        );
        let config: Config = toml::from_str(&toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPublicKey(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidWindow(60000))));
    }

    #[test]
    fn test_socket_collision_fails() {
        let toml = minimal_valid_config().replace("fmacd-control", "fmacd-trigger");
        let config: Config = toml::from_str(&toml).unwrap();
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::SocketCollision)));
    }

    #[test]
    fn test_scheme_and_outcomes_parse() {
        let toml = format!(
            "{}scheme = \"rsa-pkcs1-sha256\"\noutcomes = [\"capability\"]\nsecret_encoding = \"raw\"\n",
            minimal_valid_config()
        );
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.admission.scheme, crate::config::SignatureScheme::RsaPkcs1Sha256);
        assert!(config.admission.wants(crate::config::Outcome::Capability));
        assert!(!config.admission.wants(crate::config::Outcome::Escalate));
        assert_eq!(
            config.admission.totp_key().as_slice(),
            b"P2U6KVKZKSFKXGXO7XN6S6X62X6M6NE7"
        );
    }
}
