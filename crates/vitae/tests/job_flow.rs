//! End-to-end job lifecycle: submission, polling, failure surfacing, and
//! refine chains.

mod common;

use common::builders::{create_base, resume};
use common::harness::{EngineHarness, ProviderStep, ScriptedProvider};

use vitae::{JobStatus, SubmitRequest, VitaeError};

fn submit_request(project: &str, base_version: &str) -> SubmitRequest {
    SubmitRequest {
        project_id: project.to_string(),
        base_version_id: base_version.to_string(),
        context_id: None,
        instructions: None,
    }
}

#[tokio::test]
async fn submitted_job_completes_with_proposal() {
    let provider = ScriptedProvider::replying(&resume("Acme Corp: led the data team.", "Rust, SQL."));
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", &resume("Acme Corp.", "Rust, SQL."));

    let job = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    assert_eq!(job.status, JobStatus::Queued);

    let done = harness.wait_for_terminal(&job.id).await;
    assert_eq!(done.status, JobStatus::Completed);
    assert!(done.error.is_none());

    let proposal = harness.reconciler.get_proposal(&job.id).unwrap();
    assert!(proposal.content.contains("led the data team"));
}

#[tokio::test]
async fn polling_is_idempotent_and_resumable() {
    let provider = ScriptedProvider::replying("EXPERIENCE\nnew");
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let job = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    let done = harness.wait_for_terminal(&job.id).await;

    // Reading the same terminal state repeatedly is side-effect free, and
    // nothing but the job id is needed to resume polling.
    for _ in 0..3 {
        let again = harness.jobs.get_status(&job.id).unwrap();
        assert_eq!(again.status, done.status);
        assert_eq!(again.updated_at, done.updated_at);
    }
}

#[tokio::test]
async fn provider_failure_is_recorded_on_the_job() {
    let provider = ScriptedProvider::failing("model unavailable");
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let job = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    let done = harness.wait_for_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Failed);
    let message = done.error.unwrap();
    assert!(message.contains("generation provider failed"));
    assert!(message.contains("model unavailable"));
}

#[tokio::test]
async fn provider_timeout_is_distinct_from_failure() {
    let provider = ScriptedProvider::hanging();
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let job = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    let done = harness.wait_for_terminal(&job.id).await;

    assert_eq!(done.status, JobStatus::Failed);
    assert!(done.error.unwrap().contains("timed out"));
}

#[tokio::test]
async fn submit_rejects_unknown_or_foreign_base_version() {
    let provider = ScriptedProvider::replying("content");
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let err = harness
        .jobs
        .submit(submit_request("proj-1", "missing"))
        .unwrap_err();
    assert!(matches!(err, VitaeError::InvalidRequest(_)));

    let err = harness
        .jobs
        .submit(submit_request("proj-2", &base.id))
        .unwrap_err();
    assert!(matches!(err, VitaeError::InvalidRequest(_)));
}

#[tokio::test]
async fn job_context_and_instructions_reach_the_provider() {
    let provider = ScriptedProvider::replying("EXPERIENCE\nnew");
    let harness = EngineHarness::new(provider.clone());
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");
    let context = harness
        .jobs
        .create_context("proj-1", "Staff engineer posting at a database vendor")
        .unwrap();

    let job = harness
        .jobs
        .submit(SubmitRequest {
            project_id: "proj-1".to_string(),
            base_version_id: base.id.clone(),
            context_id: Some(context.id.clone()),
            instructions: Some("emphasize storage internals".to_string()),
        })
        .unwrap();
    harness.wait_for_terminal(&job.id).await;

    let requests = provider.seen_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].base_content, "EXPERIENCE\nold");
    assert_eq!(
        requests[0].job_context.as_deref(),
        Some("Staff engineer posting at a database vendor")
    );
    assert_eq!(
        requests[0].instructions.as_deref(),
        Some("emphasize storage internals")
    );
}

#[tokio::test]
async fn refine_chains_a_new_job_and_preserves_the_original() {
    let provider = ScriptedProvider::with_script(vec![
        ProviderStep::Reply("EXPERIENCE\nfirst draft".to_string()),
        ProviderStep::Reply("EXPERIENCE\nshorter draft".to_string()),
    ]);
    let harness = EngineHarness::new(provider.clone());
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let first = harness
        .jobs
        .submit(SubmitRequest {
            project_id: "proj-1".to_string(),
            base_version_id: base.id.clone(),
            context_id: None,
            instructions: Some("rewrite experience".to_string()),
        })
        .unwrap();
    harness.wait_for_terminal(&first.id).await;

    let second = harness.jobs.refine(&first.id, "make it shorter").unwrap();
    assert_ne!(second.id, first.id);
    assert_eq!(second.base_version_id, base.id);
    assert_eq!(second.refined_from.as_deref(), Some(first.id.as_str()));

    let second_done = harness.wait_for_terminal(&second.id).await;
    assert_eq!(second_done.status, JobStatus::Completed);

    // The original job and its proposal are untouched.
    let original = harness.jobs.get_status(&first.id).unwrap();
    assert_eq!(original.status, JobStatus::Completed);
    let original_proposal = harness.reconciler.get_proposal(&first.id).unwrap();
    assert!(original_proposal.content.contains("first draft"));

    let refined_proposal = harness.reconciler.get_proposal(&second.id).unwrap();
    assert!(refined_proposal.content.contains("shorter draft"));

    // The refine prompt carries the original instructions plus the feedback.
    let requests = provider.seen_requests();
    assert_eq!(requests.len(), 2);
    let refined_instructions = requests[1].instructions.as_deref().unwrap();
    assert!(refined_instructions.contains("rewrite experience"));
    assert!(refined_instructions.contains("make it shorter"));
}

#[tokio::test]
async fn refine_requires_a_completed_job() {
    let provider = ScriptedProvider::failing("boom");
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let job = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    harness.wait_for_terminal(&job.id).await;

    let err = harness.jobs.refine(&job.id, "try again").unwrap_err();
    assert!(matches!(err, VitaeError::InvalidState(_)));
}

#[tokio::test]
async fn concurrent_jobs_on_the_same_base_run_independently() {
    let provider = ScriptedProvider::with_script(vec![
        ProviderStep::Reply("EXPERIENCE\ndraft a".to_string()),
        ProviderStep::Fail("model unavailable".to_string()),
    ]);
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let a = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    let b = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();

    let a_done = harness.wait_for_terminal(&a.id).await;
    let b_done = harness.wait_for_terminal(&b.id).await;

    // Scheduling decides which job draws which script step; what matters is
    // that each reached its own terminal state without affecting the other.
    let statuses = [a_done.status, b_done.status];
    assert!(statuses.contains(&JobStatus::Completed));
    assert!(statuses.contains(&JobStatus::Failed));
}

#[tokio::test]
async fn list_jobs_is_newest_first() {
    let provider = ScriptedProvider::replying("EXPERIENCE\nnew");
    let harness = EngineHarness::new(provider);
    let base = create_base(&harness.versions, "proj-1", "EXPERIENCE\nold");

    let first = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    harness.wait_for_terminal(&first.id).await;
    let second = harness.jobs.submit(submit_request("proj-1", &base.id)).unwrap();
    harness.wait_for_terminal(&second.id).await;

    let jobs = harness.jobs.list_jobs("proj-1").unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].id, second.id);
    assert_eq!(jobs[1].id, first.id);
}
