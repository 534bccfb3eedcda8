//! Shared application state wiring the engine components together.

use std::sync::Arc;
use std::time::Duration;

use vitae::compile::{HttpRenderer, Renderer};
use vitae::job::{GenerativeProvider, HttpGenerativeProvider};
use vitae::{CompileCoordinator, Config, Database, JobOrchestrator, ProposalReconciler, VersionStore};

#[derive(Clone)]
pub struct AppState {
    pub versions: VersionStore,
    pub jobs: JobOrchestrator,
    pub reconciler: ProposalReconciler,
    pub compiler: CompileCoordinator,
}

impl AppState {
    pub fn new(
        db: Database,
        provider: Arc<dyn GenerativeProvider>,
        renderer: Arc<dyn Renderer>,
        provider_timeout: Duration,
        render_timeout: Duration,
    ) -> Self {
        let versions = VersionStore::new(db.clone());
        let jobs = JobOrchestrator::new(db.clone(), provider, provider_timeout);
        let reconciler = ProposalReconciler::new(db.clone());
        let compiler = CompileCoordinator::new(versions.clone(), renderer, render_timeout);
        Self {
            versions,
            jobs,
            reconciler,
            compiler,
        }
    }

    /// Builds the state with HTTP-backed provider and renderer from config.
    pub fn from_config(config: &Config, db: Database) -> Self {
        Self::new(
            db,
            Arc::new(HttpGenerativeProvider::new(&config.provider.endpoint)),
            Arc::new(HttpRenderer::new(&config.renderer.endpoint)),
            Duration::from_secs(config.provider.timeout_seconds),
            Duration::from_secs(config.renderer.timeout_seconds),
        )
    }
}
