//! End-to-end tests for AecuService with in-memory collaborators.

use std::sync::Arc;

use aecu_core::{AecuConfig, AecuError, AecuService, HistoryResult, HistoryState};
use aecu_repository::fakes::{MemoryRepository, ScriptedInterpreter};
use aecu_repository::{
    RepositorySession, ScriptInterpreter, ScriptRun, StaticRunModes, NT_FOLDER,
    NT_SLING_ORDERED_FOLDER,
};
use async_trait::async_trait;

fn service(repo: &MemoryRepository, modes: &[&str], interpreter: ScriptedInterpreter) -> AecuService {
    AecuService::new(
        Arc::new(repo.clone()),
        Arc::new(StaticRunModes::new(modes.iter().copied())),
        Arc::new(interpreter),
        AecuConfig::default(),
    )
    .unwrap()
}

/// /conf/groovy
///   01-init.groovy
///   02-content.author/          (author only)
///     pages.groovy
///     pages.fallback.groovy
///   03-replication.publish.dev/ (publish + dev)
///     agents.groovy
///   notes.txt
///   99-cleanup.groovy
fn script_tree() -> MemoryRepository {
    let repo = MemoryRepository::new();
    repo.add_folder_of_type("/conf/groovy", NT_SLING_ORDERED_FOLDER)
        .unwrap();
    repo.add_file("/conf/groovy/01-init.groovy", "").unwrap();
    repo.add_folder("/conf/groovy/02-content.author").unwrap();
    repo.add_file("/conf/groovy/02-content.author/pages.groovy", "")
        .unwrap();
    repo.add_file("/conf/groovy/02-content.author/pages.fallback.groovy", "")
        .unwrap();
    repo.add_folder_of_type("/conf/groovy/03-replication.publish.dev", NT_FOLDER)
        .unwrap();
    repo.add_file("/conf/groovy/03-replication.publish.dev/agents.groovy", "")
        .unwrap();
    repo.add_file("/conf/groovy/notes.txt", "").unwrap();
    repo.add_file("/conf/groovy/99-cleanup.groovy", "").unwrap();
    repo
}

#[tokio::test]
async fn get_files_on_author() {
    let repo = script_tree();
    let svc = service(&repo, &["author"], ScriptedInterpreter::new());

    let files = svc.get_files("/conf/groovy").await.unwrap();
    assert_eq!(
        files,
        vec![
            "/conf/groovy/01-init.groovy",
            "/conf/groovy/02-content.author/pages.groovy",
            "/conf/groovy/99-cleanup.groovy",
        ]
    );
}

#[tokio::test]
async fn get_files_needs_every_mode_of_a_combination() {
    let repo = script_tree();

    let publish_only = service(&repo, &["publish"], ScriptedInterpreter::new());
    let files = publish_only.get_files("/conf/groovy").await.unwrap();
    assert_eq!(
        files,
        vec!["/conf/groovy/01-init.groovy", "/conf/groovy/99-cleanup.groovy"]
    );

    let publish_dev = service(&repo, &["publish", "dev"], ScriptedInterpreter::new());
    let files = publish_dev.get_files("/conf/groovy").await.unwrap();
    assert!(files.contains(&"/conf/groovy/03-replication.publish.dev/agents.groovy".to_string()));
    assert!(!files.contains(&"/conf/groovy/02-content.author/pages.groovy".to_string()));
}

#[tokio::test]
async fn get_files_rejects_unknown_path() {
    let repo = script_tree();
    let svc = service(&repo, &["author"], ScriptedInterpreter::new());

    let err = svc.get_files("/conf/nothing").await.unwrap_err();
    assert!(matches!(err, AecuError::InvalidPath(_)));
    assert_eq!(repo.open_sessions(), 0);
}

#[tokio::test]
async fn execute_with_fallback() {
    let repo = script_tree();
    let interpreter = ScriptedInterpreter::new()
        .failing("/conf/groovy/02-content.author/pages.groovy", "PathNotFoundException")
        .succeeding("/conf/groovy/02-content.author/pages.fallback.groovy", "patched");
    let svc = service(&repo, &["author"], interpreter);

    let result = svc
        .execute("/conf/groovy/02-content.author/pages.groovy")
        .await
        .unwrap();

    assert!(!result.success());
    assert!(result.log().contains("PathNotFoundException"));
    let fallback = result.fallback().expect("fallback result");
    assert!(fallback.success());
    assert_eq!(fallback.output(), "patched");
    assert_eq!(repo.open_sessions(), 0);
}

#[tokio::test]
async fn execute_rejects_non_script() {
    let repo = script_tree();
    let svc = service(&repo, &["author"], ScriptedInterpreter::new());

    let err = svc.execute("/conf/groovy/notes.txt").await.unwrap_err();
    assert!(matches!(err, AecuError::InvalidScriptName(_)));
}

#[tokio::test]
async fn run_batch_records_every_script_in_order() {
    let repo = script_tree();
    let interpreter = ScriptedInterpreter::new()
        .succeeding("/conf/groovy/01-init.groovy", "ok")
        .failing("/conf/groovy/02-content.author/pages.groovy", "boom")
        .succeeding("/conf/groovy/02-content.author/pages.fallback.groovy", "ok")
        .succeeding("/conf/groovy/99-cleanup.groovy", "ok");
    let svc = service(&repo, &["author"], interpreter);

    let entry = svc.run_batch("/conf/groovy").await.unwrap();

    assert_eq!(entry.state(), HistoryState::Finished);
    assert_eq!(entry.result(), HistoryResult::Failure);
    let paths: Vec<&str> = entry.results().iter().map(|r| r.path()).collect();
    assert_eq!(
        paths,
        vec![
            "/conf/groovy/01-init.groovy",
            "/conf/groovy/02-content.author/pages.groovy",
            "/conf/groovy/99-cleanup.groovy",
        ]
    );
    assert!(entry.results()[1].fallback().is_some());
    assert!(entry.end().is_some());
    assert_eq!(repo.open_sessions(), 0);

    let stored = svc.get_history(0, 1).await.unwrap();
    assert_eq!(stored, vec![entry]);
}

#[tokio::test]
async fn run_batch_all_green_is_success() {
    let repo = script_tree();
    let interpreter = ScriptedInterpreter::new()
        .succeeding("/conf/groovy/01-init.groovy", "ok")
        .succeeding("/conf/groovy/99-cleanup.groovy", "ok");
    let svc = service(&repo, &["publish"], interpreter);

    let entry = svc.run_batch("/conf/groovy").await.unwrap();
    assert_eq!(entry.result(), HistoryResult::Success);
    assert_eq!(entry.results().len(), 2);
}

/// Interpreter whose scripts succeed but break the repository's next commit.
struct CommitBreaker {
    repo: MemoryRepository,
}

#[async_trait]
impl ScriptInterpreter for CommitBreaker {
    async fn run(&self, _session: &dyn RepositorySession, _path: &str) -> ScriptRun {
        self.repo.fail_next_commit();
        ScriptRun::default()
    }
}

#[tokio::test]
async fn run_batch_hard_error_aborts_entry() {
    let repo = script_tree();
    let svc = AecuService::new(
        Arc::new(repo.clone()),
        Arc::new(StaticRunModes::new(["publish"])),
        Arc::new(CommitBreaker { repo: repo.clone() }),
        AecuConfig::default(),
    )
    .unwrap();

    let err = svc.run_batch("/conf/groovy").await.unwrap_err();
    assert!(matches!(err, AecuError::Persistence { .. }));
    assert_eq!(repo.open_sessions(), 0);

    let history = svc.get_history(0, 1).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].state(), HistoryState::Finished);
    assert_eq!(history[0].result(), HistoryResult::Failure);
    assert!(history[0].results().is_empty());
}

#[tokio::test]
async fn run_batch_unknown_root_creates_no_entry() {
    let repo = script_tree();
    let svc = service(&repo, &["publish"], ScriptedInterpreter::new());

    let err = svc.run_batch("/conf/nothing").await.unwrap_err();
    assert!(matches!(err, AecuError::InvalidPath(_)));
    assert!(svc.get_history(0, 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn each_operation_uses_its_own_session() {
    let repo = script_tree();
    let svc = service(&repo, &["publish"], ScriptedInterpreter::new());

    let mut entry = svc.create_history_entry().await.unwrap();
    let result = svc.execute("/conf/groovy/01-init.groovy").await.unwrap();
    svc.store_execution_in_history(&mut entry, result)
        .await
        .unwrap();
    svc.finish_history_entry(&mut entry).await.unwrap();

    assert_eq!(repo.login_count(), 4);
    assert_eq!(repo.commit_count(), 3);
    assert_eq!(repo.open_sessions(), 0);
}
