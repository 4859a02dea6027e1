//! Image domain — list/inspect/remove plus pull and build with streamed
//! progress.

use std::pin::Pin;

use tokio::process::Child;
use tokio_stream::Stream;

use crate::cli::client::{classify_stderr, CliClient, CliError};
use crate::cli::container::stream_from_child;
use crate::client::ops::BuildSpec;
use crate::client::stream::{OutputSource, StreamEvent};
use crate::model::{Image, ProgressEvent};
use crate::parser::progress::{parse_build_progress, parse_pull_progress};
use crate::parser::records::{parse_image_inspect, parse_image_list};
use crate::validate::validate_image_ref;

// ── Argv builders ───────────────────────────────────────────────

pub(crate) fn image_list_args() -> Vec<String> {
    vec![
        "image".to_string(),
        "list".to_string(),
        "--format".to_string(),
        "json".to_string(),
    ]
}

pub(crate) fn image_inspect_args(reference: &str) -> Vec<String> {
    vec!["image".to_string(), "inspect".to_string(), reference.to_string()]
}

pub(crate) fn image_pull_args(reference: &str) -> Vec<String> {
    vec!["image".to_string(), "pull".to_string(), reference.to_string()]
}

pub(crate) fn image_remove_args(reference: &str, force: bool) -> Vec<String> {
    let mut args = vec!["image".to_string(), "rm".to_string()];
    if force {
        args.push("-f".to_string());
    }
    args.push(reference.to_string());
    args
}

pub(crate) fn image_build_args(spec: &BuildSpec) -> Vec<String> {
    let mut args = vec![
        "image".to_string(),
        "build".to_string(),
        "-t".to_string(),
        spec.tag.clone(),
    ];
    if let Some(dockerfile) = &spec.dockerfile {
        args.push("-f".to_string());
        args.push(dockerfile.clone());
    }
    args.push(spec.context_dir.clone());
    args
}

// ── Operations ──────────────────────────────────────────────────

impl CliClient {
    pub async fn list_images(&self) -> Result<Vec<Image>, CliError> {
        let out = self.exec_default(&image_list_args()).await?;
        parse_image_list(&out)
    }

    pub async fn inspect_image(&self, reference: &str) -> Result<Image, CliError> {
        validate_image_ref(reference)?;
        let out = self.exec_default(&image_inspect_args(reference)).await?;
        parse_image_inspect(&out)
    }

    pub async fn remove_image(&self, reference: &str, force: bool) -> Result<(), CliError> {
        validate_image_ref(reference)?;
        self.exec_default(&image_remove_args(reference, force)).await?;
        Ok(())
    }

    /// Pull an image, classifying each output line into a progress event.
    /// Dropping the stream cancels the transfer.
    pub fn pull_image_stream(
        &self,
        reference: &str,
    ) -> Pin<Box<dyn Stream<Item = Result<ProgressEvent, CliError>> + Send + 'static>> {
        let setup = validate_image_ref(reference)
            .map_err(CliError::from)
            .and_then(|_| self.spawn_streaming(&image_pull_args(reference), false));
        progress_stream(setup, parse_pull_progress)
    }

    /// Build an image from a context directory, streaming step progress.
    pub fn build_image_stream(
        &self,
        spec: BuildSpec,
    ) -> Pin<Box<dyn Stream<Item = Result<ProgressEvent, CliError>> + Send + 'static>> {
        let setup = self.spawn_streaming(&image_build_args(&spec), false);
        progress_stream(setup, parse_build_progress)
    }
}

/// Turn a spawned pull/build child into a stream of classified progress
/// events, line by line, in arrival order. A non-zero exit yields one final
/// error classified from the accumulated stderr.
fn progress_stream(
    setup: Result<Child, CliError>,
    classify: fn(&str) -> ProgressEvent,
) -> Pin<Box<dyn Stream<Item = Result<ProgressEvent, CliError>> + Send + 'static>> {
    Box::pin(async_stream::stream! {
        let child = match setup {
            Ok(child) => child,
            Err(e) => {
                yield Err(e);
                return;
            }
        };

        let mut handle = stream_from_child(child);
        let mut pending = String::new();
        let mut stderr_tail = String::new();

        while let Some(event) = handle.recv().await {
            match event {
                StreamEvent::Output { source, data } => {
                    let text = String::from_utf8_lossy(&data);
                    if source == OutputSource::Stderr {
                        stderr_tail.push_str(&text);
                    }
                    pending.push_str(&text);
                    while let Some(idx) = pending.find('\n') {
                        let line: String = pending.drain(..=idx).collect();
                        let trimmed = line.trim();
                        if !trimmed.is_empty() {
                            yield Ok(classify(trimmed));
                        }
                    }
                }
                StreamEvent::Exit { code } => {
                    let rest = pending.trim().to_string();
                    if !rest.is_empty() {
                        yield Ok(classify(&rest));
                    }
                    if code != Some(0) {
                        yield Err(classify_stderr(&stderr_tail));
                    }
                    return;
                }
                StreamEvent::Error { message } => {
                    yield Err(CliError::Unknown { stderr: message });
                    return;
                }
            }
        }
    })
}
