//! Per-session refresh loop: resolve, generate, enrich, push, sleep, repeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use waypoint_core::{CycleId, EnrichedFact, OutboundMessage, Place, TelemetrySource};
use waypoint_settings::RefreshSettings;

use crate::enricher::ImageEnricher;
use crate::error::EngineError;
use crate::generator::ContentGenerator;
use crate::resolver::PositionResolver;
use crate::session::{Phase, SessionState};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTiming {
    /// Sleep after every cycle, successful or not.
    pub idle_interval: Duration,
    /// Sleep between checks while the viewer is reading.
    pub reading_recheck: Duration,
}

impl RefreshTiming {
    pub fn from_settings(settings: &RefreshSettings) -> Self {
        Self {
            idle_interval: settings.idle_interval(),
            reading_recheck: settings.reading_recheck(),
        }
    }
}

impl Default for RefreshTiming {
    fn default() -> Self {
        Self::from_settings(&RefreshSettings::default())
    }
}

/// The three stages of a cycle. Stateless across sessions, so one instance is
/// shared by every controller.
pub struct Pipeline {
    pub resolver: PositionResolver,
    pub generator: ContentGenerator,
    pub enricher: ImageEnricher,
}

impl Pipeline {
    pub fn new(
        resolver: PositionResolver,
        generator: ContentGenerator,
        enricher: ImageEnricher,
    ) -> Self {
        Self {
            resolver,
            generator,
            enricher,
        }
    }
}

/// Summary of one delivered cycle.
#[derive(Clone, Debug)]
pub struct CycleReport {
    pub cycle_id: CycleId,
    pub place: Place,
    pub facts: usize,
}

pub struct RefreshController {
    pipeline: Arc<Pipeline>,
    telemetry: Arc<dyn TelemetrySource>,
    state: Arc<SessionState>,
    outbound: mpsc::Sender<OutboundMessage>,
    timing: RefreshTiming,
}

impl RefreshController {
    pub fn new(
        pipeline: Arc<Pipeline>,
        telemetry: Arc<dyn TelemetrySource>,
        state: Arc<SessionState>,
        outbound: mpsc::Sender<OutboundMessage>,
        timing: RefreshTiming,
    ) -> Self {
        Self {
            pipeline,
            telemetry,
            state,
            outbound,
            timing,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run cycles until the session is closed.
    ///
    /// Closing the session drops any in-flight cycle at its next await point;
    /// nothing from it is pushed afterwards.
    #[instrument(skip(self), fields(session_id = %self.state.id()))]
    pub async fn run(self) {
        info!("refresh loop started");
        while self.state.is_live() {
            let delay = if self.state.is_reading() {
                debug!("viewer reading, deferring cycle");
                self.timing.reading_recheck
            } else {
                tokio::select! {
                    biased;
                    _ = self.state.cancelled() => break,
                    outcome = self.run_cycle() => match outcome {
                        Ok(report) => info!(
                            cycle_id = %report.cycle_id,
                            place = %report.place,
                            facts = report.facts,
                            "cycle delivered"
                        ),
                        Err(e) => {
                            self.state.set_phase(Phase::Idle);
                            warn!(error = %e, "cycle failed, nothing pushed");
                        }
                    },
                }
                self.timing.idle_interval
            };

            tokio::select! {
                biased;
                _ = self.state.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        self.state.set_phase(Phase::Stopped);
        info!("refresh loop stopped");
    }

    /// One full cycle. The location is pushed as soon as it is known, the
    /// facts once every stage has settled.
    pub async fn run_cycle(&self) -> Result<CycleReport, EngineError> {
        let cycle_id = CycleId::new();

        self.state.set_phase(Phase::Resolving);
        let place = self.pipeline.resolver.resolve(self.telemetry.as_ref()).await;
        self.push(OutboundMessage::Location(place.clone())).await?;

        self.state.set_phase(Phase::Generating);
        let items = self.pipeline.generator.generate(&place).await;

        self.state.set_phase(Phase::Enriching);
        let titles: Vec<String> = items.iter().map(|item| item.title.clone()).collect();
        let images = self.pipeline.enricher.enrich(&titles).await;

        let facts = EnrichedFact::join(items, images);
        let count = facts.len();
        // Raised before the push so a fast "done reading" cannot be overwritten.
        if count > 0 {
            self.state.set_reading();
        }
        self.push(OutboundMessage::Facts(facts)).await?;
        self.state.set_phase(Phase::Delivered);

        Ok(CycleReport {
            cycle_id,
            place,
            facts: count,
        })
    }

    async fn push(&self, message: OutboundMessage) -> Result<(), EngineError> {
        let event = message.event_name();
        self.outbound
            .send(message)
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        debug!(event, "pushed to viewer");
        Ok(())
    }
}
