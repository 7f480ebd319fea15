//! End-to-end simulation tests
//!
//! Drive the simulator through whole days with stub text generators and
//! check what the snapshots record.

use async_trait::async_trait;
use std::fs;
use std::sync::Arc;

use org_core::components::agent::{DynamicState, Personality};
use org_core::pipeline::decision::{evaluate_acceptance, Acceptance};
use org_core::tasks::RejectReason;
use org_core::{
    CrisisKind, GenerationRequest, GenerationResponse, JsonlSnapshotSink, MemorySnapshotSink,
    OrgSimulator, SimConfig, SimError, TemplateTextGenerator, TextGenError, TextGenerator,
};
use org_events::{MarketEvent, MarketEventKind, Polarity};

/// Generator whose every call fails as if the service were unavailable
struct UnavailableGenerator;

#[async_trait]
impl TextGenerator for UnavailableGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, TextGenError> {
        Err(TextGenError::RateLimited)
    }
}

/// Generator that always answers with the same sentence
struct FixedGenerator(&'static str);

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, TextGenError> {
        Ok(GenerationResponse::text(self.0))
    }
}

fn config(seed: u64) -> SimConfig {
    let mut config = SimConfig::default();
    config.simulation.seed = seed;
    config
}

async fn run_to_file(seed: u64, days: u64, path: &std::path::Path) {
    let sink = JsonlSnapshotSink::create(path).unwrap();
    let mut sim = OrgSimulator::start(config(seed), Arc::new(TemplateTextGenerator), sink).unwrap();
    sim.run_n_days(days).await.unwrap();
    sim.stop().unwrap();
}

#[tokio::test]
async fn test_same_seed_writes_identical_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.jsonl");
    let second = dir.path().join("second.jsonl");

    run_to_file(7, 5, &first).await;
    run_to_file(7, 5, &second).await;

    let a = fs::read(&first).unwrap();
    let b = fs::read(&second).unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b, "same seed should serialize byte-identically");
    assert_eq!(String::from_utf8(a).unwrap().lines().count(), 5);
}

#[tokio::test]
async fn test_different_seeds_diverge() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("seed_1.jsonl");
    let second = dir.path().join("seed_2.jsonl");

    run_to_file(1, 3, &first).await;
    run_to_file(2, 3, &second).await;

    assert_ne!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
}

#[tokio::test]
async fn test_unavailable_generator_degrades_tasks_only() {
    let sink = MemorySnapshotSink::new();
    let mut sim = OrgSimulator::start(config(11), Arc::new(UnavailableGenerator), sink.clone()).unwrap();

    let snapshots = sim.run_n_days(3).await.unwrap();
    assert_eq!(snapshots.len(), 3);
    assert_eq!(sink.snapshots().len(), 3);

    let failed: u32 = snapshots.iter().map(|s| s.metrics.performance.tasks_failed).sum();
    assert!(failed > 0, "no accepted task reached the generator");
    assert!(snapshots.iter().any(|s| s.tasks_with_status("failed").count() > 0));

    for snapshot in &snapshots {
        assert_eq!(snapshot.tasks_with_status("completed").count(), 0);
        for task in snapshot.tasks_with_status("failed") {
            assert_eq!(task.reason.as_deref(), Some("external_service_error"));
            assert!(task.decision.is_none());
        }
        let performance = &snapshot.metrics.performance;
        assert_eq!(performance.external_service_failures, performance.tasks_failed);
    }
}

#[tokio::test]
async fn test_no_task_left_pending() {
    let mut sim =
        OrgSimulator::start(config(3), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

    for snapshot in sim.run_n_days(10).await.unwrap() {
        assert!(!snapshot.tasks.is_empty());
        for task in &snapshot.tasks {
            assert!(
                matches!(task.status.as_str(), "rejected" | "completed" | "failed"),
                "day {} task {} ended as {}",
                snapshot.day,
                task.task_id,
                task.status
            );
        }
    }
}

#[tokio::test]
async fn test_free_text_response_becomes_decision() {
    let generator = FixedGenerator("We should run an experimental pilot. Then scale it.");
    let mut sim = OrgSimulator::start(config(5), Arc::new(generator), MemorySnapshotSink::new()).unwrap();

    let snapshot = sim.advance_one_day().await.unwrap();
    let resolved: Vec<_> = snapshot
        .tasks
        .iter()
        .filter(|t| t.status == "completed" || t.status == "failed")
        .collect();

    for task in resolved {
        let decision = task.decision.as_ref().unwrap();
        assert_eq!(decision.approach, "innovative");
        assert_eq!(decision.summary, "We should run an experimental pilot.");
    }
}

#[test]
fn test_acceptance_depends_on_workload() {
    let personality = Personality {
        risk_tolerance: 0.9,
        ..Personality::default()
    };
    let fresh = DynamicState {
        workload: 0.1,
        ..DynamicState::default()
    };
    let swamped = DynamicState {
        workload: 0.95,
        ..DynamicState::default()
    };

    assert!(matches!(
        evaluate_acceptance("cto", &personality, &fresh, 0.5, 0.2, 0.35),
        Acceptance::Accept { .. }
    ));
    assert!(matches!(
        evaluate_acceptance("cto", &personality, &swamped, 0.5, 0.2, 0.35),
        Acceptance::Reject {
            reason: RejectReason::Overloaded,
            ..
        }
    ));
}

#[tokio::test]
async fn test_competitive_shock_raises_churn() {
    let mut baseline =
        OrgSimulator::start(config(21), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();
    let mut shocked =
        OrgSimulator::start(config(21), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

    shocked
        .inject_market_event(MarketEvent::new(MarketEventKind::Competitive, Polarity::Negative, 0.7))
        .unwrap();

    let calm = baseline.advance_one_day().await.unwrap();
    let hit = shocked.advance_one_day().await.unwrap();

    assert_eq!(hit.market.events_applied.len(), 1);
    for (before, after) in calm.market.segments.iter().zip(&hit.market.segments) {
        assert_eq!(before.segment, after.segment);
        assert!(
            after.churn_probability > before.churn_probability,
            "{} churn did not rise",
            after.segment
        );
    }
}

#[tokio::test]
async fn test_stopped_simulator_refuses_work() {
    let sink = MemorySnapshotSink::new();
    let mut sim = OrgSimulator::start(config(9), Arc::new(TemplateTextGenerator), sink.clone()).unwrap();
    sim.run_n_days(2).await.unwrap();
    sim.stop().unwrap();

    assert!(matches!(sim.advance_one_day().await, Err(SimError::NotRunning)));
    assert!(matches!(
        sim.inject_crisis(CrisisKind::MarketDownturn, 0.5),
        Err(SimError::NotRunning)
    ));
    assert_eq!(sim.current_day(), 2);
    assert_eq!(sink.snapshots().len(), 2);
}

#[tokio::test]
async fn test_internal_event_recorded_each_day_when_certain() {
    let mut config = config(17);
    config.organization.internal_event_probability = 1.0;
    let mut sim = OrgSimulator::start(config, Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

    for snapshot in sim.run_n_days(4).await.unwrap() {
        assert_eq!(snapshot.internal_events.len(), 1, "day {}", snapshot.day);
        assert_ne!(snapshot.internal_events[0].impact, 0.0);
    }
}

#[tokio::test]
async fn test_forecasts_need_three_days_of_history() {
    let mut sim =
        OrgSimulator::start(config(19), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();
    let snapshots = sim.run_n_days(4).await.unwrap();

    let names: Vec<&str> = snapshots[0].analytics.forecasts.iter().map(|f| f.metric.as_str()).collect();
    assert_eq!(names, ["task_success_rate", "morale", "customer_satisfaction", "budget"]);
    assert!(snapshots[1].analytics.forecasts.iter().all(|f| f.trend == "insufficient_data"));
    for forecast in &snapshots[3].analytics.forecasts {
        assert_ne!(forecast.trend, "insufficient_data");
        assert_eq!(forecast.predictions.len(), 5);
    }
}

#[tokio::test]
async fn test_repeat_partners_carry_track_record() {
    let mut config = config(23);
    config.collaboration.daily_probability = 1.0;
    let mut sim = OrgSimulator::start(config, Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();
    let snapshots = sim.run_n_days(2).await.unwrap();

    assert!(snapshots[0].collaborations.iter().all(|c| c.prior_quality.is_none()));
    assert!(!snapshots[1].collaborations.is_empty());
    assert!(snapshots[1].collaborations.iter().all(|c| c.prior_quality.is_some()));
    assert_eq!(snapshots[1].agent("cto").unwrap().experience.collaboration_partners, 3);
}

#[tokio::test]
async fn test_market_reports_competitor_shares() {
    let mut sim =
        OrgSimulator::start(config(29), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

    for snapshot in sim.run_n_days(3).await.unwrap() {
        let shares = &snapshot.market.competitors;
        assert_eq!(shares.len(), 5);
        let total: f32 = shares.iter().map(|c| c.share).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert!(shares.iter().any(|c| c.name == "our_company"));
    }
}

#[tokio::test]
async fn test_funding_crisis_cuts_budget() {
    let mut baseline =
        OrgSimulator::start(config(13), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();
    let mut squeezed =
        OrgSimulator::start(config(13), Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

    squeezed.inject_crisis(CrisisKind::FundingChallenge, 1.0).unwrap();

    let calm = baseline.advance_one_day().await.unwrap();
    let hit = squeezed.advance_one_day().await.unwrap();

    assert!(hit.metrics.financials.budget < calm.metrics.financials.budget);
    assert!(hit.messages.iter().any(|m| m.kind == "escalation" && m.to == "cfo"));
}
