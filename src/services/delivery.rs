//! Hand-off of accepted documents to an external application.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

use crate::config::DeliverySettings;
use crate::models::PatientRecord;

/// Errors from a delivery attempt.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

/// Something that imports an accepted document into another system.
pub trait Delivery: Send + Sync {
    fn name(&self) -> &str;

    fn deliver(&self, document: &Path, patient: &PatientRecord) -> Result<(), DeliveryError>;
}

/// Delivery that does nothing; the import directory is the final destination.
pub struct NoDelivery;

impl Delivery for NoDelivery {
    fn name(&self) -> &str {
        "none"
    }

    fn deliver(&self, _document: &Path, _patient: &PatientRecord) -> Result<(), DeliveryError> {
        Ok(())
    }
}

/// Runs an external command per accepted document.
///
/// Arguments may contain `{file}`, `{patient_id}`, `{surname}` and
/// `{given_name}` placeholders.
pub struct CommandDelivery {
    command: String,
    args: Vec<String>,
}

impl CommandDelivery {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Arguments with placeholders filled in for one document.
    pub fn expand_args(&self, document: &Path, patient: &PatientRecord) -> Vec<String> {
        let file = document.display().to_string();
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{file}", &file)
                    .replace("{patient_id}", &patient.id)
                    .replace("{surname}", &patient.surname)
                    .replace("{given_name}", &patient.given_name)
            })
            .collect()
    }
}

impl Delivery for CommandDelivery {
    fn name(&self) -> &str {
        &self.command
    }

    fn deliver(&self, document: &Path, patient: &PatientRecord) -> Result<(), DeliveryError> {
        let args = self.expand_args(document, patient);
        tracing::debug!("Delivering {} via {} {:?}", document.display(), self.command, args);

        let output = Command::new(&self.command)
            .args(&args)
            .output()
            .map_err(|source| DeliveryError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(DeliveryError::Failed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}

/// Build the configured delivery.
pub fn from_settings(settings: &DeliverySettings) -> Box<dyn Delivery> {
    match settings.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => {
            Box::new(CommandDelivery::new(command, settings.args.clone()))
        }
        _ => Box::new(NoDelivery),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patient() -> PatientRecord {
        PatientRecord::new("42", "DUPONT", "Jean")
    }

    #[test]
    fn test_placeholders_are_expanded() {
        let delivery = CommandDelivery::new(
            "osascript",
            vec![
                "import.scpt".to_string(),
                "{file}".to_string(),
                "{patient_id}:{surname}/{given_name}".to_string(),
            ],
        );
        let args = delivery.expand_args(Path::new("/import/42_scan.pdf"), &patient());
        assert_eq!(args, vec!["import.scpt", "/import/42_scan.pdf", "42:DUPONT/Jean"]);
    }

    #[test]
    fn test_from_settings() {
        let none = from_settings(&DeliverySettings::default());
        assert_eq!(none.name(), "none");

        let blank = from_settings(&DeliverySettings {
            command: Some("  ".to_string()),
            args: Vec::new(),
        });
        assert_eq!(blank.name(), "none");

        let cmd = from_settings(&DeliverySettings {
            command: Some("import-tool".to_string()),
            args: Vec::new(),
        });
        assert_eq!(cmd.name(), "import-tool");
    }

    #[test]
    fn test_missing_command_is_spawn_error() {
        let delivery = CommandDelivery::new("definitely-not-a-real-binary-name", Vec::new());
        assert!(matches!(
            delivery.deliver(Path::new("scan.pdf"), &patient()),
            Err(DeliveryError::Spawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_status_decides_success() {
        assert!(CommandDelivery::new("true", Vec::new())
            .deliver(Path::new("scan.pdf"), &patient())
            .is_ok());
        assert!(matches!(
            CommandDelivery::new("false", Vec::new()).deliver(Path::new("scan.pdf"), &patient()),
            Err(DeliveryError::Failed { .. })
        ));
    }

    #[test]
    fn test_no_delivery_succeeds() {
        assert!(NoDelivery.deliver(Path::new("scan.pdf"), &patient()).is_ok());
    }
}
