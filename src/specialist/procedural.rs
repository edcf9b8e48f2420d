//! Procedural specialists: deterministic local computation, no adapter.

use crate::specialist::helpers::missing_artifact_update;
use crate::specialist::Specialist;
use crate::state::{ArtifactSlot, ArtifactValue, Message, RunError, StateRecord, StateUpdate};
use anyhow::{bail, Context, Result};
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Persists the document artifact to disk under a sandboxed root.
///
/// Writes are dry-run by default: the specialist reports what it *would*
/// write and only touches the filesystem when `allow_writes` is explicitly
/// enabled. The output file name is validated at construction so a run can
/// never escape the sandbox root.
pub struct FileStoreSpecialist {
    name: String,
    sandbox_root: PathBuf,
    file_name: String,
    allow_writes: bool,
    /// Specialist recommended when the document artifact is missing.
    document_producer: String,
}

impl FileStoreSpecialist {
    pub fn new(
        name: impl Into<String>,
        sandbox_root: impl Into<PathBuf>,
        file_name: impl Into<String>,
        allow_writes: bool,
        document_producer: impl Into<String>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        validate_relative(&file_name)?;
        Ok(Self {
            name: name.into(),
            sandbox_root: sandbox_root.into(),
            file_name,
            allow_writes,
            document_producer: document_producer.into(),
        })
    }

    fn target_path(&self) -> PathBuf {
        self.sandbox_root.join(&self.file_name)
    }
}

/// Reject absolute paths and any traversal component.
fn validate_relative(file_name: &str) -> Result<()> {
    let path = Path::new(file_name);
    if path.is_absolute() {
        bail!("output path '{file_name}' must be relative to the sandbox root");
    }
    for component in path.components() {
        if !matches!(component, Component::Normal(_)) {
            bail!("output path '{file_name}' escapes the sandbox root");
        }
    }
    Ok(())
}

#[async_trait::async_trait]
impl Specialist for FileStoreSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &StateRecord) -> StateUpdate {
        let Some(document) = state.artifacts.document.as_deref() else {
            return missing_artifact_update(
                &self.name,
                ArtifactSlot::Document,
                &self.document_producer,
            );
        };

        let path = self.target_path();
        if !self.allow_writes {
            info!(
                specialist = %self.name,
                path = %path.display(),
                bytes = document.len(),
                "dry run, skipping write"
            );
            return StateUpdate::new().with_message(Message::assistant(
                &self.name,
                format!(
                    "Dry run: would write {} bytes to {}. Enable writes to persist.",
                    document.len(),
                    path.display()
                ),
            ));
        }

        match write_document(&self.sandbox_root, &path, document).await {
            Ok(()) => {
                info!(specialist = %self.name, path = %path.display(), "document written");
                StateUpdate::new().with_message(Message::assistant(
                    &self.name,
                    format!("Wrote {} bytes to {}.", document.len(), path.display()),
                ))
            }
            Err(error) => {
                warn!(specialist = %self.name, error = %error, "write failed");
                StateUpdate::new()
                    .with_message(Message::assistant(
                        &self.name,
                        format!("failed to write document: {error:#}"),
                    ))
                    .with_error(RunError::new(&self.name, "io", format!("{error:#}")))
            }
        }
    }
}

async fn write_document(root: &Path, path: &Path, document: &str) -> Result<()> {
    let parent = path.parent().unwrap_or(root);
    tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("creating {}", parent.display()))?;
    tokio::fs::write(path, document)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Reads one sandboxed file into the pending-text artifact slot.
///
/// Reading is non-destructive, so there is no dry-run mode; the same path
/// validation as the store specialist keeps reads inside the sandbox root.
pub struct FileReadSpecialist {
    name: String,
    sandbox_root: PathBuf,
    file_name: String,
}

impl FileReadSpecialist {
    pub fn new(
        name: impl Into<String>,
        sandbox_root: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Result<Self> {
        let file_name = file_name.into();
        validate_relative(&file_name)?;
        Ok(Self {
            name: name.into(),
            sandbox_root: sandbox_root.into(),
            file_name,
        })
    }
}

#[async_trait::async_trait]
impl Specialist for FileReadSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, _state: &StateRecord) -> StateUpdate {
        let path = self.sandbox_root.join(&self.file_name);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                info!(
                    specialist = %self.name,
                    path = %path.display(),
                    bytes = content.len(),
                    "file read into context"
                );
                StateUpdate::new()
                    .with_message(Message::assistant(
                        &self.name,
                        format!(
                            "Read {} bytes from {} into context.",
                            content.len(),
                            path.display()
                        ),
                    ))
                    .with_artifact(ArtifactSlot::PendingText, ArtifactValue::Text(content))
            }
            Err(error) => {
                warn!(specialist = %self.name, path = %path.display(), error = %error, "read failed");
                StateUpdate::new()
                    .with_message(Message::assistant(
                        &self.name,
                        format!("failed to read {}: {error}", path.display()),
                    ))
                    .with_error(RunError::new(
                        &self.name,
                        "io",
                        format!("reading {}: {error}", path.display()),
                    ))
            }
        }
    }
}

/// Assembles a human-readable run report into the report artifact slot.
///
/// The report covers the goal, every routing decision, artifact presence,
/// any captured error, and the full attributed transcript, so a halted run
/// stays diagnosable from state alone.
pub struct ArchiverSpecialist {
    name: String,
}

impl ArchiverSpecialist {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    fn render_report(&self, state: &StateRecord) -> String {
        let mut report = String::new();
        report.push_str("# Run Report\n\n");
        report.push_str(&format!(
            "Generated: {}\n\n",
            chrono::Utc::now().to_rfc3339()
        ));

        if let Some(goal) = state.messages.first() {
            report.push_str(&format!("## Goal\n\n{}\n\n", goal.content));
        }

        report.push_str("## Routing\n\n");
        if state.routing_history.is_empty() {
            report.push_str("(no routing decisions)\n");
        } else {
            for target in &state.routing_history {
                report.push_str(&format!("- {target}\n"));
            }
        }
        report.push('\n');

        report.push_str("## Artifacts\n\n");
        for slot in [
            ArtifactSlot::Structured,
            ArtifactSlot::Document,
            ArtifactSlot::PendingText,
        ] {
            let status = if state.artifacts.has(slot) {
                "present"
            } else {
                "empty"
            };
            report.push_str(&format!("- {slot}: {status}\n"));
        }
        report.push('\n');

        if let Some(error) = &state.error {
            report.push_str(&format!(
                "## Error\n\n`{}` in `{}`: {}\n\n",
                error.kind, error.specialist, error.message
            ));
        }

        report.push_str("## Transcript\n\n");
        for message in &state.messages {
            let who = message.name.as_deref().unwrap_or(message.role.as_str());
            report.push_str(&format!("**{who}** ({}): {}\n\n", message.role, message.content));
        }
        report
    }
}

#[async_trait::async_trait]
impl Specialist for ArchiverSpecialist {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, state: &StateRecord) -> StateUpdate {
        let report = self.render_report(state);
        info!(specialist = %self.name, bytes = report.len(), "report assembled");
        StateUpdate::new()
            .with_message(Message::assistant(&self.name, "Run report assembled."))
            .with_artifact(ArtifactSlot::Report, ArtifactValue::Text(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traversal_paths_rejected_at_construction() {
        assert!(FileStoreSpecialist::new("f", "/tmp/root", "../escape.html", true, "b").is_err());
        assert!(FileStoreSpecialist::new("f", "/tmp/root", "/etc/passwd", true, "b").is_err());
        assert!(FileStoreSpecialist::new("f", "/tmp/root", "a/../../b.html", true, "b").is_err());
        assert!(FileStoreSpecialist::new("f", "/tmp/root", "pages/index.html", true, "b").is_ok());
    }

    #[tokio::test]
    async fn test_dry_run_does_not_write() {
        let dir = tempfile::tempdir().unwrap();
        let specialist =
            FileStoreSpecialist::new("file_store", dir.path(), "out.html", false, "web_builder")
                .unwrap();

        let mut state = StateRecord::from_goal("store it");
        state.artifacts.document = Some("<html/>".to_string());

        let update = specialist.execute(&state).await;
        assert!(update.error.is_none());
        assert!(update.messages[0].content.contains("Dry run"));
        assert!(!dir.path().join("out.html").exists());
    }

    #[tokio::test]
    async fn test_write_when_safety_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let specialist =
            FileStoreSpecialist::new("file_store", dir.path(), "out.html", true, "web_builder")
                .unwrap();

        let mut state = StateRecord::from_goal("store it");
        state.artifacts.document = Some("<html>ok</html>".to_string());

        let update = specialist.execute(&state).await;
        assert!(update.error.is_none());
        let written = std::fs::read_to_string(dir.path().join("out.html")).unwrap();
        assert_eq!(written, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_missing_document_recommends_producer() {
        let dir = tempfile::tempdir().unwrap();
        let specialist =
            FileStoreSpecialist::new("file_store", dir.path(), "out.html", true, "web_builder")
                .unwrap();

        let update = specialist.execute(&StateRecord::from_goal("store")).await;
        assert_eq!(
            update.recommended_specialists,
            Some(vec!["web_builder".to_string()])
        );
        assert!(update.error.is_none());
    }

    #[tokio::test]
    async fn test_read_file_fills_pending_text() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "raw notes").unwrap();
        let specialist = FileReadSpecialist::new("file_reader", dir.path(), "notes.txt").unwrap();

        let update = specialist.execute(&StateRecord::from_goal("load")).await;
        assert!(update.error.is_none());
        assert_eq!(update.artifacts[0].0, ArtifactSlot::PendingText);
        assert_eq!(
            update.artifacts[0].1,
            ArtifactValue::Text("raw notes".to_string())
        );
    }

    #[tokio::test]
    async fn test_read_missing_file_is_error_update() {
        let dir = tempfile::tempdir().unwrap();
        let specialist = FileReadSpecialist::new("file_reader", dir.path(), "absent.txt").unwrap();

        let update = specialist.execute(&StateRecord::from_goal("load")).await;
        let error = update.error.unwrap();
        assert_eq!(error.kind, "io");
        assert!(update.artifacts.is_empty());
    }

    #[test]
    fn test_read_rejects_traversal_paths() {
        assert!(FileReadSpecialist::new("f", "/tmp/root", "../secrets.txt").is_err());
        assert!(FileReadSpecialist::new("f", "/tmp/root", "/etc/passwd").is_err());
    }

    #[tokio::test]
    async fn test_archiver_report_covers_state() {
        let mut state = StateRecord::from_goal("draw a bridge");
        state.routing_history.push("diagrammer".to_string());
        state.artifacts.structured = Some(serde_json::json!({"nodes": []}));
        state.error = Some(RunError::new("renderer", "timeout", "request timed out"));
        state
            .messages
            .push(Message::assistant("diagrammer", "drew it"));

        let update = ArchiverSpecialist::new("archiver").execute(&state).await;

        assert_eq!(update.artifacts[0].0, ArtifactSlot::Report);
        let ArtifactValue::Text(report) = &update.artifacts[0].1 else {
            panic!("report must be text");
        };
        assert!(report.contains("draw a bridge"));
        assert!(report.contains("- diagrammer"));
        assert!(report.contains("structured: present"));
        assert!(report.contains("document: empty"));
        assert!(report.contains("`timeout` in `renderer`"));
        assert!(report.contains("**diagrammer**"));
    }
}
