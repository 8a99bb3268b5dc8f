//! Payload orchestration engine

use anyhow::Context;
use futures::StreamExt;
use futures::stream;
use gadgetforge_codegen::{CommandCompiler, Vm, serialize};
use gadgetforge_core::{Classification, GadgetRegistry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TaskError};
use crate::jobs::{self, GenerationJob, JobKind};
use crate::library::{GadgetConstructionError, Payload, PayloadLibrary};
use crate::output::OutputWriter;
use crate::report::{JobOutcome, JobStatus, RunReport};

/// Upper bound on the default worker count
const MAX_DEFAULT_WORKERS: usize = 8;

/// Tuning for one orchestrator run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Directory artifacts are written to
    pub output_dir: PathBuf,

    /// Jobs in flight at once
    pub workers: usize,

    /// Budget for building one artifact
    pub task_timeout: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_DEFAULT_WORKERS);
        Self {
            output_dir: PathBuf::from("../static/gadgets"),
            workers,
            task_timeout: Duration::from_secs(30),
        }
    }
}

impl RunOptions {
    /// Defaults with a different output directory
    pub fn with_output_dir(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }
}

/// Drives one generation run over the whole gadget catalog
pub struct Orchestrator {
    registry: Arc<GadgetRegistry>,
    library: Arc<dyn PayloadLibrary>,
    compiler: CommandCompiler,
    options: RunOptions,
}

impl Orchestrator {
    /// Create an orchestrator
    pub fn new(
        registry: Arc<GadgetRegistry>,
        library: Arc<dyn PayloadLibrary>,
        options: RunOptions,
    ) -> Self {
        Self {
            registry,
            library,
            compiler: CommandCompiler::default(),
            options,
        }
    }

    /// Use a specific compiler for validating transform commands
    pub fn with_compiler(mut self, compiler: CommandCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Run options
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Generate every artifact.
    ///
    /// Only an unusable output directory fails the run; per-job failures
    /// are logged and recorded in the report.
    pub async fn run(&self, classification: &Classification) -> Result<RunReport> {
        let writer = OutputWriter::new(&self.options.output_dir);
        writer.ensure_directory().await.with_context(|| {
            format!(
                "Failed to create output directory {}",
                writer.directory().display()
            )
        })?;

        for path in self.registry.disabled() {
            tracing::warn!(
                gadget = %path.gadget,
                command = %path.command,
                reason = %path.reason,
                "Single-shot path disabled, not generating"
            );
        }

        let jobs = jobs::plan(&self.registry, classification);
        let excluded = jobs::excluded_pairs(&self.registry, classification);
        tracing::info!(
            jobs = jobs.len(),
            excluded,
            workers = self.options.workers,
            "Starting generation run"
        );

        let outcomes: Vec<JobOutcome> = stream::iter(jobs)
            .map(|job| self.execute(job, &writer))
            .buffered(self.options.workers.max(1))
            .collect()
            .await;

        let report = RunReport {
            output_dir: writer.directory().to_path_buf(),
            outcomes,
            excluded,
            disabled: self
                .registry
                .disabled()
                .iter()
                .map(|d| d.gadget.clone())
                .collect(),
        };
        tracing::info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            excluded = report.excluded,
            "Generation run complete"
        );
        Ok(report)
    }

    async fn execute(&self, job: GenerationJob, writer: &OutputWriter) -> JobOutcome {
        let label = job.label();
        let status = match self.build_with_timeout(&job).await {
            Ok(bytes) => match writer.write(&job.filename, &bytes).await {
                Ok(path) => {
                    tracing::debug!(
                        gadget = %job.gadget,
                        label = %label,
                        path = %path.display(),
                        bytes = bytes.len(),
                        "Wrote artifact"
                    );
                    JobStatus::written(&bytes)
                }
                Err(e) => failed(&job, &label, TaskError::Write(e)),
            },
            Err(e) => failed(&job, &label, e),
        };

        JobOutcome {
            gadget: job.gadget,
            label,
            filename: job.filename,
            status,
        }
    }

    async fn build_with_timeout(&self, job: &GenerationJob) -> std::result::Result<Vec<u8>, TaskError> {
        let library = Arc::clone(&self.library);
        let compiler = self.compiler.clone();
        let task = job.clone();
        let handle = tokio::task::spawn_blocking(move || build(library.as_ref(), &compiler, &task));

        match tokio::time::timeout(self.options.task_timeout, handle).await {
            Err(_) => Err(TaskError::TimedOut(self.options.task_timeout)),
            Ok(Err(join)) => Err(TaskError::Panicked(join.to_string())),
            Ok(Ok(result)) => result,
        }
    }
}

fn failed(job: &GenerationJob, label: &str, error: TaskError) -> JobStatus {
    tracing::error!(
        gadget = %job.gadget,
        label = %label,
        error = %error,
        "Generation failed"
    );
    JobStatus::Failed {
        error: error.to_string(),
    }
}

/// Build one artifact's bytes. Runs on a blocking thread.
fn build(
    library: &dyn PayloadLibrary,
    compiler: &CommandCompiler,
    job: &GenerationJob,
) -> std::result::Result<Vec<u8>, TaskError> {
    match (&job.kind, job.command.as_deref()) {
        (JobKind::Transform { verb }, Some(command)) => {
            let chain = compiler.compile(command)?;
            let trace = Vm::trace(&chain)?;
            tracing::debug!(
                gadget = %job.gadget,
                verb = %verb,
                steps = chain.len(),
                chain = %trace.expression(),
                "Compiled transform command"
            );
        }
        (JobKind::RefFun { tag }, None) => {
            return Err(GadgetConstructionError::MissingImplementation {
                gadget: job.gadget.clone(),
                command: format!("unknown ref-fun tag '{tag}'"),
            }
            .into());
        }
        _ => {}
    }

    match library.materialize(&job.gadget, job.command.as_deref())? {
        Payload::Raw(bytes) => Ok(bytes),
        Payload::Graph(graph) => {
            serialize(&graph).map_err(|e| TaskError::Serialize(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gadgetforge_core::ClassificationSource;

    #[test]
    fn test_default_options() {
        let options = RunOptions::default();
        assert!(options.workers >= 1 && options.workers <= MAX_DEFAULT_WORKERS);
        assert_eq!(options.task_timeout, Duration::from_secs(30));
        assert_eq!(options.output_dir, PathBuf::from("../static/gadgets"));
    }

    struct Echo;

    impl PayloadLibrary for Echo {
        fn materialize(
            &self,
            gadget: &str,
            command: Option<&str>,
        ) -> std::result::Result<Payload, GadgetConstructionError> {
            Ok(Payload::Raw(
                format!("{gadget}|{}", command.unwrap_or("-")).into_bytes(),
            ))
        }
    }

    fn job(kind: JobKind, command: Option<&str>) -> GenerationJob {
        GenerationJob {
            gadget: "G".to_string(),
            kind,
            command: command.map(str::to_string),
            filename: "G.ser".to_string(),
        }
    }

    #[test]
    fn test_build_passes_command_through() {
        let bytes = build(
            &Echo,
            &CommandCompiler::default(),
            &job(JobKind::OneOff, Some("{{param0}};{{param1}}")),
        )
        .unwrap();
        assert_eq!(bytes, b"G|{{param0}};{{param1}}");
    }

    #[test]
    fn test_build_rejects_uncompilable_transform() {
        let err = build(
            &Echo,
            &CommandCompiler::default(),
            &job(
                JobKind::Transform {
                    verb: gadgetforge_core::Verb::Loadjar,
                },
                Some("loadjar:only-one-segment"),
            ),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Compile(_)));
    }

    #[test]
    fn test_build_unknown_ref_fun_tag() {
        let err = build(
            &Echo,
            &CommandCompiler::default(),
            &job(JobKind::RefFun { tag: "mystery".into() }, None),
        )
        .unwrap_err();
        assert!(matches!(err, TaskError::Construction(_)));
    }

    #[tokio::test]
    async fn test_unusable_output_dir_fails_run() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"").unwrap();

        let orchestrator = Orchestrator::new(
            Arc::new(GadgetRegistry::builtin()),
            Arc::new(Echo),
            RunOptions::with_output_dir(blocker.join("out")),
        );
        let result = orchestrator
            .run(&Classification::empty(ClassificationSource::BuiltinDefault))
            .await;
        assert!(result.is_err());
    }
}
