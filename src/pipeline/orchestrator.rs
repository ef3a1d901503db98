use super::report::GenerationReport;
use crate::analysis::{Analysis, ProjectAnalyzer};
use crate::context::AccountContext;
use crate::error::{FamilyFailure, PipelineError, Stage};
use crate::fs::FileSystem;
use crate::generate::{FamilySelection, GenerateOptions, GeneratorRegistry};
use crate::intent::{Confirmer, IntentInterpreter, Intent, TerminalConfirmer};
use crate::output::{OutputWriter, WriteOutcome};
use crate::progress::{LoggingHandler, ProgressEvent, ProgressHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Per-run settings for [`Pipeline::generate`]
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `None` generates the family the intent names
    pub selection: Option<FamilySelection>,
    pub output_dir: PathBuf,
    pub generate: GenerateOptions,
}

impl RunOptions {
    pub fn new(selection: FamilySelection, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            selection: Some(selection),
            output_dir: output_dir.into(),
            generate: GenerateOptions::new(),
        }
    }

    pub fn for_intent(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            selection: None,
            output_dir: output_dir.into(),
            generate: GenerateOptions::new(),
        }
    }

    pub fn with_generate_options(mut self, options: GenerateOptions) -> Self {
        self.generate = options;
        self
    }
}

pub struct Pipeline<F: FileSystem> {
    analyzer: ProjectAnalyzer<F>,
    interpreter: Box<dyn IntentInterpreter>,
    confirmer: Box<dyn Confirmer>,
    registry: GeneratorRegistry,
    progress: Arc<dyn ProgressHandler>,
}

impl<F: FileSystem> Pipeline<F> {
    pub fn new(analyzer: ProjectAnalyzer<F>, interpreter: Box<dyn IntentInterpreter>) -> Self {
        Self {
            analyzer,
            interpreter,
            confirmer: Box::new(TerminalConfirmer::new()),
            registry: GeneratorRegistry::new(),
            progress: Arc::new(LoggingHandler),
        }
    }

    pub fn with_confirmer(mut self, confirmer: Box<dyn Confirmer>) -> Self {
        self.confirmer = confirmer;
        self
    }

    pub fn with_registry(mut self, registry: GeneratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    fn started(&self, stage: Stage) -> Instant {
        self.progress.on_progress(&ProgressEvent::StageStarted { stage });
        Instant::now()
    }

    fn completed(&self, stage: Stage, start: Instant) {
        self.progress.on_progress(&ProgressEvent::StageComplete {
            stage,
            duration: start.elapsed(),
        });
    }

    pub async fn analyze(&self, root: &Path, ctx: &AccountContext) -> Result<Analysis, PipelineError> {
        let start = self.started(Stage::Analysis);
        let analysis = self.analyzer.analyze(root, ctx).await?;

        if ctx.is_configured() && analysis.infrastructure.is_none() {
            self.progress.on_progress(&ProgressEvent::StageDegraded {
                stage: Stage::Inventory,
                reason: "no resources could be listed".to_string(),
            });
        }
        self.completed(Stage::Analysis, start);
        Ok(analysis)
    }

    pub async fn interpret(&self, goal: &str, analysis: &Analysis) -> Result<Intent, PipelineError> {
        let start = self.started(Stage::Interpretation);
        let intent = self.interpreter.interpret(goal, analysis).await?;
        self.completed(Stage::Interpretation, start);
        Ok(intent)
    }

    /// Full run. Declining the confirmation leaves the output directory untouched.
    ///
    /// Family failures do not fail the run; they are listed in the report, and
    /// [`GenerationReport::error`] turns them into `PartialGeneration`.
    pub async fn generate(
        &self,
        root: &Path,
        goal: &str,
        ctx: &AccountContext,
        options: &RunOptions,
    ) -> Result<GenerationReport, PipelineError> {
        let analysis = self.analyze(root, ctx).await?;
        let intent = self.interpret(goal, &analysis).await?;

        let confirmed = self
            .confirmer
            .confirm(&intent)
            .map_err(|e| PipelineError::Confirmation(e.to_string()))?;
        if !confirmed {
            info!("Generation declined; nothing written");
            return Err(PipelineError::Declined);
        }

        let selection = options
            .selection
            .unwrap_or(FamilySelection::One(intent.artifact_family()));
        let start = self.started(Stage::Generation);
        let outcomes = self
            .registry
            .generate(&selection, &analysis, &intent, &options.generate);
        self.completed(Stage::Generation, start);

        let start = self.started(Stage::Write);
        let writer = OutputWriter::new(&options.output_dir);
        let mut written = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            let family = outcome.family;
            let result = outcome
                .result
                .map_err(|e| FamilyFailure {
                    family,
                    stage: Stage::Generation,
                    message: e.to_string(),
                    written: Vec::new(),
                })
                .and_then(|set| {
                    writer.write(&set).map_err(|e| FamilyFailure {
                        family,
                        stage: Stage::Write,
                        message: e.to_string(),
                        written: e.written_so_far.clone(),
                    })
                });

            match result {
                Ok(report) => {
                    self.progress.on_progress(&ProgressEvent::FamilyComplete {
                        family: family.to_string(),
                        files_written: report.changed(),
                        files_unchanged: report.count(WriteOutcome::Unchanged),
                    });
                    written.push(report);
                }
                Err(failure) => {
                    self.progress.on_progress(&ProgressEvent::FamilyFailed {
                        family: family.to_string(),
                        error: failure.message.clone(),
                    });
                    failures.push(failure);
                }
            }
        }
        self.completed(Stage::Write, start);

        info!(
            families = written.len(),
            failed = failures.len(),
            output = %options.output_dir.display(),
            "Generation finished"
        );

        Ok(GenerationReport {
            analysis,
            intent,
            output_dir: options.output_dir.clone(),
            written,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::generate::{ArtifactFamily, ArtifactGenerator, ArtifactSet, GenerateError};
    use crate::intent::{AlwaysDecline, AutoConfirm, KeywordInterpreter};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingHandler {
        events: Mutex<Vec<String>>,
    }

    impl ProgressHandler for RecordingHandler {
        fn on_progress(&self, event: &ProgressEvent) {
            let label = match event {
                ProgressEvent::StageStarted { stage } => format!("start:{}", stage),
                ProgressEvent::StageComplete { stage, .. } => format!("done:{}", stage),
                ProgressEvent::StageDegraded { stage, .. } => format!("degraded:{}", stage),
                ProgressEvent::FamilyComplete { family, .. } => format!("family:{}", family),
                ProgressEvent::FamilyFailed { family, .. } => format!("failed:{}", family),
            };
            if let Ok(mut events) = self.events.lock() {
                events.push(label);
            }
        }
    }

    struct Failing;

    impl ArtifactGenerator for Failing {
        fn family(&self) -> ArtifactFamily {
            ArtifactFamily::Monitoring
        }

        fn generate(&self, _: &Analysis, _: &Intent, _: &GenerateOptions) -> Result<ArtifactSet, GenerateError> {
            Err(GenerateError::Unsupported {
                family: ArtifactFamily::Monitoring,
                message: "disabled".to_string(),
            })
        }
    }

    fn project() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("package.json", r#"{"name": "shop", "dependencies": {"express": "^4"}}"#);
        fs
    }

    fn pipeline(fs: MockFileSystem) -> Pipeline<MockFileSystem> {
        Pipeline::new(ProjectAnalyzer::new(fs), Box::new(KeywordInterpreter))
            .with_confirmer(Box::new(AutoConfirm))
    }

    #[tokio::test]
    async fn test_declined_writes_nothing() {
        let out = TempDir::new().unwrap();
        let pipeline = pipeline(project()).with_confirmer(Box::new(AlwaysDecline));
        let options = RunOptions::new(FamilySelection::All, out.path().join("gen"));

        let err = pipeline
            .generate(Path::new("/mock"), "dev environment", &AccountContext::unconfigured(), &options)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Declined));
        assert_eq!(err.exit_code(), 2);
        assert!(!out.path().join("gen").exists());
    }

    #[tokio::test]
    async fn test_family_failure_does_not_block_others() {
        let out = TempDir::new().unwrap();
        let mut registry = GeneratorRegistry::new();
        registry.register(Box::new(Failing));
        let handler = Arc::new(RecordingHandler::default());

        let pipeline = pipeline(project())
            .with_registry(registry)
            .with_progress(handler.clone());
        let options = RunOptions::new(FamilySelection::All, out.path());

        let report = pipeline
            .generate(Path::new("/mock"), "", &AccountContext::unconfigured(), &options)
            .await
            .unwrap();

        assert_eq!(report.attempted(), 6);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].family, ArtifactFamily::Monitoring);
        assert_eq!(report.failures[0].stage, Stage::Generation);
        assert!(out.path().join("Dockerfile").is_file());
        assert!(out.path().join(".github/workflows/ci.yml").is_file());

        let err = report.error().unwrap();
        assert_eq!(err.exit_code(), 3);

        let events = handler.events.lock().unwrap();
        assert!(events.contains(&"failed:monitoring".to_string()));
        assert!(events.contains(&"family:ci".to_string()));
        let generation = events.iter().position(|e| e == "start:generation").unwrap();
        let write = events.iter().position(|e| e == "start:write").unwrap();
        assert!(generation < write);
    }

    #[tokio::test]
    async fn test_missing_root_is_analysis_error() {
        let pipeline = pipeline(MockFileSystem::new());
        let err = pipeline
            .analyze(Path::new("/mock/missing"), &AccountContext::unconfigured())
            .await
            .unwrap_err();
        assert_eq!(err.stage(), Stage::Analysis);
    }

    #[tokio::test]
    async fn test_configured_account_without_inventory_is_degraded() {
        let handler = Arc::new(RecordingHandler::default());
        let pipeline = pipeline(project()).with_progress(handler.clone());

        pipeline
            .analyze(Path::new("/mock"), &AccountContext::new("acme", "us-east-1"))
            .await
            .unwrap();

        let events = handler.events.lock().unwrap();
        assert!(events.contains(&"degraded:inventory".to_string()));
    }

    #[tokio::test]
    async fn test_intent_family_used_without_selection() {
        let out = TempDir::new().unwrap();
        let options = RunOptions::for_intent(out.path());

        let report = pipeline(project())
            .generate(Path::new("/mock"), "set up a ci pipeline", &AccountContext::unconfigured(), &options)
            .await
            .unwrap();

        assert_eq!(report.intent.artifact_family(), ArtifactFamily::Ci);
        assert_eq!(report.attempted(), 1);
        assert!(out.path().join(".github/workflows/ci.yml").is_file());
        assert!(!out.path().join("terraform").exists());
    }
}
