//! Organizational Simulator
//!
//! Owns the ECS world and drives one simulated day end-to-end:
//!
//! 1. the morning schedule opens the day, applies crises, advances the
//!    market, generates tasks and decides acceptance;
//! 2. every accepted task's text-generation request is awaited
//!    concurrently, each under its own timeout;
//! 3. the evening schedule resolves tasks and negotiations, updates
//!    learning and metrics, and checks invariants;
//! 4. the day's snapshot is kept in history and emitted to the sink.
//!
//! A stop request takes effect between days. An invariant violation or a
//! snapshot the sink could not write halts the simulator for good.

pub mod daily;

use bevy_ecs::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::components::world::{DayClock, InvariantViolations};
use crate::config::{SimConfig, SimulationSpeed};
use crate::crisis::{CrisisKind, CrisisQueue};
use crate::error::{SimError, StateInvariantError};
use crate::market::{Campaign, CustomerSegment, MarketEngine};
use crate::output::{build_snapshot, SnapshotSink};
use crate::pipeline::textgen::{generate_all, TextGenerator};
use crate::pipeline::{GenerationResults, PendingGeneration};
use crate::setup::build_world;
use org_events::{CampaignKind, DailySnapshot, MarketEvent};

use daily::{evening_schedule, morning_schedule};

/// Requests a stop from outside the simulator. Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct OrgSimulator {
    world: World,
    morning: Schedule,
    evening: Schedule,
    generator: Arc<dyn TextGenerator>,
    sink: Box<dyn SnapshotSink>,
    history: VecDeque<DailySnapshot>,
    history_limit: usize,
    stop: StopHandle,
    halted: bool,
    timeout: Duration,
    speed: SimulationSpeed,
}

impl OrgSimulator {
    /// Validates the configuration and builds a simulator at day 0.
    pub fn start(
        config: SimConfig,
        generator: Arc<dyn TextGenerator>,
        sink: impl SnapshotSink + 'static,
    ) -> Result<Self, SimError> {
        config.validate()?;

        info!(
            organization = %config.organization.name,
            seed = config.simulation.seed,
            "simulation started"
        );

        Ok(Self {
            world: build_world(&config),
            morning: morning_schedule(),
            evening: evening_schedule(),
            generator,
            sink: Box::new(sink),
            history: VecDeque::new(),
            history_limit: config.simulation.history_limit,
            stop: StopHandle::default(),
            halted: false,
            timeout: config.text_generation.timeout(),
            speed: config.simulation.speed,
        })
    }

    fn ensure_running(&self) -> Result<(), SimError> {
        if self.halted {
            Err(SimError::Halted)
        } else if self.stop.is_stopped() {
            Err(SimError::NotRunning)
        } else {
            Ok(())
        }
    }

    fn halt(&mut self, err: StateInvariantError) -> SimError {
        error!(day = self.current_day(), %err, "halting simulation");
        self.halted = true;
        SimError::StateInvariant(err)
    }

    fn check_violations(&mut self) -> Result<(), SimError> {
        let first = self.world.resource_mut::<InvariantViolations>().take_first();
        match first {
            Some(err) => Err(self.halt(err)),
            None => Ok(()),
        }
    }

    /// Simulates one day and returns its snapshot.
    pub async fn advance_one_day(&mut self) -> Result<DailySnapshot, SimError> {
        self.ensure_running()?;
        self.world.resource_mut::<InvariantViolations>().errors.clear();

        self.morning.run(&mut self.world);
        self.check_violations()?;

        let requests = self.world.resource::<PendingGeneration>().requests();
        let results = generate_all(Arc::clone(&self.generator), requests, self.timeout).await;
        self.world.resource_mut::<GenerationResults>().results = results;

        self.evening.run(&mut self.world);
        self.check_violations()?;

        let snapshot = match build_snapshot(&self.world) {
            Ok(snapshot) => snapshot,
            Err(err) => return Err(self.halt(err)),
        };
        let performance = &snapshot.metrics.performance;
        info!(
            day = snapshot.day,
            regime = %snapshot.market.regime,
            completed = performance.tasks_completed,
            failed = performance.tasks_failed,
            rejected = performance.tasks_rejected,
            denials = performance.resource_denials,
            budget = snapshot.metrics.financials.budget,
            "day complete"
        );

        self.history.push_back(snapshot.clone());
        while self.history.len() > self.history_limit {
            self.history.pop_front();
        }

        // A lost snapshot would leave a gap in the sink's day sequence.
        if let Err(err) = self.sink.emit(&snapshot) {
            error!(day = snapshot.day, %err, "snapshot not written, halting simulation");
            self.halted = true;
            return Err(SimError::Sink(err));
        }
        Ok(snapshot)
    }

    /// Simulates up to `n` days, stopping early if a stop is requested.
    pub async fn run_n_days(&mut self, n: u64) -> Result<Vec<DailySnapshot>, SimError> {
        self.ensure_running()?;
        let mut snapshots = Vec::new();
        for _ in 0..n {
            if self.stop.is_stopped() {
                info!(day = self.current_day(), "stop requested");
                break;
            }
            snapshots.push(self.advance_one_day().await?);
        }
        Ok(snapshots)
    }

    /// Stops the run and flushes the sink. Later days return `NotRunning`.
    pub fn stop(&mut self) -> Result<(), SimError> {
        self.stop.stop();
        self.sink.flush()?;
        info!(day = self.current_day(), "simulation stopped");
        Ok(())
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Queues a market event for the next day.
    pub fn inject_market_event(&mut self, event: MarketEvent) -> Result<(), SimError> {
        self.ensure_running()?;
        self.world.resource_mut::<MarketEngine>().inject(event)?;
        Ok(())
    }

    /// Queues a marketing campaign for the next day. `None` targets every segment.
    pub fn launch_campaign(&mut self, kind: CampaignKind, target: Option<CustomerSegment>) -> Result<(), SimError> {
        self.ensure_running()?;
        self.world
            .resource_mut::<MarketEngine>()
            .launch_campaign(Campaign::new(kind, target));
        Ok(())
    }

    /// Queues a crisis for the next day.
    pub fn inject_crisis(&mut self, kind: CrisisKind, severity: f32) -> Result<(), SimError> {
        self.ensure_running()?;
        self.world.resource_mut::<CrisisQueue>().push(kind, severity)?;
        Ok(())
    }

    /// Retained snapshots, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &DailySnapshot> {
        self.history.iter()
    }

    pub fn current_day(&self) -> u64 {
        self.world.resource::<DayClock>().day
    }

    /// Advisory pacing for callers that drive days in real time.
    pub fn speed(&self) -> SimulationSpeed {
        self.speed
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    #[cfg(test)]
    pub(crate) fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::world::AgentRoster;
    use crate::components::agent::Personality;
    use crate::output::MemorySnapshotSink;
    use crate::pipeline::textgen::TemplateTextGenerator;
    use org_events::{MarketEventKind, Polarity};

    fn simulator(sink: MemorySnapshotSink) -> OrgSimulator {
        OrgSimulator::start(SimConfig::default(), Arc::new(TemplateTextGenerator), sink).unwrap()
    }

    #[tokio::test]
    async fn test_days_advance_and_emit() {
        let sink = MemorySnapshotSink::new();
        let mut sim = simulator(sink.clone());

        let snapshots = sim.run_n_days(3).await.unwrap();
        assert_eq!(snapshots.len(), 3);
        assert_eq!(sim.current_day(), 3);

        let days: Vec<u64> = sink.snapshots().iter().map(|s| s.day).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(sim.history().count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let mut config = SimConfig::default();
        config.organization.name.clear();
        let result = OrgSimulator::start(config, Arc::new(TemplateTextGenerator), MemorySnapshotSink::new());
        assert!(matches!(result, Err(SimError::Validation(_))));
    }

    #[tokio::test]
    async fn test_stop_between_days() {
        let mut sim = simulator(MemorySnapshotSink::new());
        sim.advance_one_day().await.unwrap();

        let handle = sim.stop_handle();
        handle.stop();

        assert!(matches!(sim.advance_one_day().await, Err(SimError::NotRunning)));
        assert!(matches!(sim.run_n_days(2).await, Err(SimError::NotRunning)));
        assert_eq!(sim.current_day(), 1);
    }

    #[tokio::test]
    async fn test_invalid_injection_leaves_state_untouched() {
        let mut sim = simulator(MemorySnapshotSink::new());
        let event = MarketEvent::new(MarketEventKind::Competitive, Polarity::Negative, 1.5);

        assert!(matches!(sim.inject_market_event(event), Err(SimError::Validation(_))));
        assert!(sim.world().resource::<MarketEngine>().pending_events().is_empty());
        assert!(matches!(
            sim.inject_crisis(CrisisKind::FundingChallenge, -0.1),
            Err(SimError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_history_capped() {
        let mut config = SimConfig::default();
        config.simulation.history_limit = 2;
        let mut sim = OrgSimulator::start(config, Arc::new(TemplateTextGenerator), MemorySnapshotSink::new()).unwrap();

        sim.run_n_days(4).await.unwrap();
        let days: Vec<u64> = sim.history().map(|s| s.day).collect();
        assert_eq!(days, vec![3, 4]);
    }

    #[tokio::test]
    async fn test_invariant_violation_halts() {
        let sink = MemorySnapshotSink::new();
        let mut sim = simulator(sink.clone());

        let entity = sim.world().resource::<AgentRoster>().entity("cto").unwrap();
        sim.world_mut().get_mut::<Personality>(entity).unwrap().risk_tolerance = 1.5;

        assert!(matches!(sim.advance_one_day().await, Err(SimError::StateInvariant(_))));
        assert!(sim.is_halted());
        assert!(matches!(sim.advance_one_day().await, Err(SimError::Halted)));
        assert!(sink.snapshots().is_empty());
    }

    /// Sink that fails on its second write and records the rest
    struct FailOnceSink {
        writes: usize,
        inner: MemorySnapshotSink,
    }

    impl SnapshotSink for FailOnceSink {
        fn emit(&mut self, snapshot: &DailySnapshot) -> Result<(), crate::error::SinkError> {
            self.writes += 1;
            if self.writes == 2 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full").into());
            }
            self.inner.emit(snapshot)
        }
    }

    #[tokio::test]
    async fn test_sink_failure_halts_without_gap() {
        let recorded = MemorySnapshotSink::new();
        let sink = FailOnceSink {
            writes: 0,
            inner: recorded.clone(),
        };
        let mut sim = OrgSimulator::start(SimConfig::default(), Arc::new(TemplateTextGenerator), sink).unwrap();

        sim.advance_one_day().await.unwrap();
        assert!(matches!(sim.advance_one_day().await, Err(SimError::Sink(_))));
        assert!(sim.is_halted());
        assert!(matches!(sim.advance_one_day().await, Err(SimError::Halted)));

        let written: Vec<u64> = recorded.snapshots().iter().map(|s| s.day).collect();
        assert_eq!(written, vec![1]);
        let kept: Vec<u64> = sim.history().map(|s| s.day).collect();
        assert_eq!(kept, vec![1, 2]);
        assert_eq!(sim.current_day(), 2);
    }

    #[tokio::test]
    async fn test_campaign_recorded_in_next_snapshot() {
        let mut sim = simulator(MemorySnapshotSink::new());
        sim.launch_campaign(CampaignKind::BrandAwareness, Some(CustomerSegment::SmallBusiness))
            .unwrap();

        let snapshot = sim.advance_one_day().await.unwrap();
        assert_eq!(snapshot.market.campaigns.len(), 1);
        assert_eq!(snapshot.market.campaigns[0].campaign, CampaignKind::BrandAwareness);
        assert_eq!(snapshot.market.campaigns[0].target_segment.as_deref(), Some("small_business"));

        sim.stop().unwrap();
        assert!(matches!(
            sim.launch_campaign(CampaignKind::ProductDemo, None),
            Err(SimError::NotRunning)
        ));
    }

    #[tokio::test]
    async fn test_crisis_lowers_morale() {
        let mut sim = simulator(MemorySnapshotSink::new());
        let baseline = sim.advance_one_day().await.unwrap();

        sim.inject_crisis(CrisisKind::KeyTalentLoss, 1.0).unwrap();
        let after = sim.advance_one_day().await.unwrap();

        assert!(after.metrics.health.morale < baseline.metrics.health.morale);
    }
}
