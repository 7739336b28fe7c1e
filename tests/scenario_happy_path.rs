//! Seed scenario: a chapter request runs Plan -> Scaffold -> Section ->
//! Assemble end to end against the deterministic stub backend and comes
//! out the other side as a published `ReaderDoc` with one block per
//! asset marker the scaffold declared.

use readerforge_gate::GateRegistry;
use readerforge_llm::{LlmGateway, StubBackend};
use readerforge_orchestrator::{Pipeline, PipelineConfig};
use readerforge_phases::StageContext;
use readerforge_ratelimit::{KeyConfig, RateLimiter};
use readerforge_repair::RepairEngine;
use readerforge_retry::{PolicyTable, RetryExecutor};
use readerforge_types::{ChapterRequest, CorrelationId, Difficulty, Subject};

fn gateway(cache_dir: &camino::Utf8Path) -> LlmGateway {
    let cache = readerforge_store::ContentStore::new(cache_dir.to_path_buf(), 64);
    LlmGateway::new(
        Box::new(StubBackend::new()),
        cache,
        RateLimiter::new(8),
        KeyConfig::default(),
        RetryExecutor::new(PolicyTable::default()),
    )
    .unwrap()
}

#[test]
fn a_full_request_produces_a_reader_doc_with_non_empty_sections() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = camino::Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap();

    let gw = gateway(&cache_dir);
    let gates = GateRegistry::with_defaults();
    let repair = RepairEngine::new();

    let ctx = StageContext::new(CorrelationId("corr-happy".to_string()), &gw, &gates, &repair);
    let pipeline = Pipeline::new(
        ctx,
        PipelineConfig {
            section_concurrency: 2,
            reference_index: Vec::new(),
        },
    );

    let request = ChapterRequest {
        grade: "9".to_string(),
        subject: Subject::Physics,
        chapter: "Kinematics".to_string(),
        standard: "NGSS".to_string(),
        difficulty: Difficulty::Comfort,
        attachments: Vec::new(),
        correlation_id: None,
    };

    let (_fsm, doc) = pipeline.run("kinematics", &request).expect("pipeline run should succeed against the stub backend");

    assert!(!doc.meta.section_titles.is_empty());
    assert!(!doc.blocks.is_empty());
    assert_eq!(doc.meta.subject, Subject::Physics);
    assert_eq!(doc.meta.chapter, "Kinematics");
}
