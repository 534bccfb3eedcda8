//! Test harness for isolated engine tests.
//!
//! Wires a fresh in-memory database to the engine components and provides
//! scripted provider/renderer implementations so job execution is fully
//! deterministic without any network.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vitae::compile::{RenderOutput, Renderer, RendererError};
use vitae::job::{GeneratedDraft, GenerationRequest, GenerativeProvider, ProviderError};
use vitae::{CompileCoordinator, Database, Job, JobOrchestrator, ProposalReconciler, VersionStore};

/// What the scripted provider does for one generate call.
#[derive(Clone)]
pub enum ProviderStep {
    /// Answer with this replacement content.
    Reply(String),
    /// Fail with this message.
    Fail(String),
    /// Sleep past the orchestrator's timeout.
    Hang,
}

/// Provider that plays back a script of steps, repeating the last one, and
/// records every request it saw.
pub struct ScriptedProvider {
    script: Mutex<Vec<ProviderStep>>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedProvider {
    pub fn replying(content: &str) -> Arc<Self> {
        Self::with_script(vec![ProviderStep::Reply(content.to_string())])
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::with_script(vec![ProviderStep::Fail(message.to_string())])
    }

    pub fn hanging() -> Arc<Self> {
        Self::with_script(vec![ProviderStep::Hang])
    }

    pub fn with_script(script: Vec<ProviderStep>) -> Arc<Self> {
        assert!(!script.is_empty(), "provider script must not be empty");
        Arc::new(Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn seen_requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeProvider for ScriptedProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedDraft, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let step = {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 {
                script.remove(0)
            } else {
                script[0].clone()
            }
        };
        match step {
            ProviderStep::Reply(content) => Ok(GeneratedDraft { content }),
            ProviderStep::Fail(message) => Err(ProviderError::Request(message)),
            ProviderStep::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Err(ProviderError::Request("unreachable".to_string()))
            }
        }
    }
}

/// Renderer that plays back a fixed outcome.
pub enum ScriptedRenderer {
    Artifact { url: String, warnings: Vec<String> },
    Rejected { diagnostics: Vec<String> },
    Unreachable,
}

impl ScriptedRenderer {
    pub fn artifact(url: &str) -> Arc<Self> {
        Arc::new(Self::Artifact {
            url: url.to_string(),
            warnings: vec![],
        })
    }

    pub fn rejected(diagnostics: &[&str]) -> Arc<Self> {
        Arc::new(Self::Rejected {
            diagnostics: diagnostics.iter().map(|d| d.to_string()).collect(),
        })
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, _content: &str) -> Result<RenderOutput, RendererError> {
        match self {
            Self::Artifact { url, warnings } => Ok(RenderOutput::Artifact {
                url: url.clone(),
                warnings: warnings.clone(),
            }),
            Self::Rejected { diagnostics } => Ok(RenderOutput::Rejected {
                diagnostics: diagnostics.clone(),
            }),
            Self::Unreachable => Err(RendererError::Request("connection refused".to_string())),
        }
    }
}

/// Fully wired engine over an in-memory database.
pub struct EngineHarness {
    pub db: Database,
    pub versions: VersionStore,
    pub jobs: JobOrchestrator,
    pub reconciler: ProposalReconciler,
}

impl EngineHarness {
    pub fn new(provider: Arc<dyn GenerativeProvider>) -> Self {
        let db = Database::open_in_memory().expect("Failed to create in-memory database");
        let versions = VersionStore::new(db.clone());
        let jobs = JobOrchestrator::new(db.clone(), provider, Duration::from_millis(250));
        let reconciler = ProposalReconciler::new(db.clone());
        Self {
            db,
            versions,
            jobs,
            reconciler,
        }
    }

    pub fn compiler(&self, renderer: Arc<dyn Renderer>) -> CompileCoordinator {
        CompileCoordinator::new(self.versions.clone(), renderer, Duration::from_millis(250))
    }

    /// Polls a job until it reaches a terminal state, asserting that the
    /// observed status sequence never moves backwards.
    pub async fn wait_for_terminal(&self, job_id: &str) -> Job {
        let mut last_rank = 0u8;
        for _ in 0..400 {
            let job = self.jobs.get_status(job_id).expect("job status read");
            let rank = status_rank(&job);
            assert!(
                rank >= last_rank,
                "job {} status went backwards ({} -> {})",
                job_id,
                last_rank,
                rank
            );
            last_rank = rank;
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("job {} did not reach a terminal state", job_id);
    }
}

fn status_rank(job: &Job) -> u8 {
    match job.status {
        vitae::JobStatus::Queued => 0,
        vitae::JobStatus::Running => 1,
        vitae::JobStatus::Completed | vitae::JobStatus::Failed => 2,
    }
}
