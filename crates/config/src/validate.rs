//! Configuration validation
//!
//! Checks a loaded configuration without touching the network or the
//! filesystem. All problems are collected so a single `--test` run reports
//! everything at once.

use tracing::warn;
use url::Url;

use crate::{CertificateEntry, Config, ConfigError, PermissionClass};

impl Config {
    /// Validate every certificate entry
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        for (index, entry) in self.certificates.iter().enumerate() {
            for problem in entry.problems() {
                problems.push(format!("certificates[{}]: {}", index, problem));
            }

            if entry.paths.is_empty() {
                warn!(url = %entry.url, "Certificate entry manages no files");
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

impl CertificateEntry {
    fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if self.url.trim().is_empty() {
            problems.push("url is required".to_string());
        } else {
            match Url::parse(&self.url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                Ok(url) => problems.push(format!(
                    "url {:?} has unsupported scheme {:?}",
                    self.url,
                    url.scheme()
                )),
                Err(e) => problems.push(format!("url {:?} is invalid: {}", self.url, e)),
            }
        }

        for (name, class) in [
            ("certificates", PermissionClass::Certificate),
            ("keys", PermissionClass::Key),
        ] {
            if let Err(e) = self.permissions.mode(class) {
                problems.push(format!("permissions.{}: {}", name, e));
            }
        }

        for (index, command) in self.commands.iter().enumerate() {
            if command.trim().is_empty() {
                problems.push(format!("commands[{}] is empty", index));
            }
        }

        problems
    }
}
