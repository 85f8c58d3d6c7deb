use std::time::Duration;

use posrelay_frame::{encode_position, unix_millis};
use posrelay_transport::PacketSink;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{validate_fleet, FleetConfig};
use crate::error::{GeneratorError, Result};
use crate::source::{DriftState, SourceConfig};
use crate::writer::{frame_channel, FrameSender};

/// How one source task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub sys_id: u8,
    pub frames_sent: u64,
    /// Set when the task ended on an error rather than on cancellation.
    pub error: Option<String>,
}

/// Summary of a finished fleet run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetReport {
    pub sources: Vec<SourceOutcome>,
    pub frames_written: u64,
    /// Set when the writer stopped on a transport failure.
    pub writer_error: Option<String>,
}

impl FleetReport {
    pub fn is_clean(&self) -> bool {
        self.writer_error.is_none() && self.sources.iter().all(|s| s.error.is_none())
    }
}

/// A set of simulated sources sharing one outbound transport.
#[derive(Debug, Clone)]
pub struct Fleet {
    sources: Vec<SourceConfig>,
    config: FleetConfig,
    seed: Option<u64>,
}

impl Fleet {
    /// Validate the source list and build a fleet.
    pub fn new(sources: Vec<SourceConfig>, config: FleetConfig) -> Result<Self> {
        validate_fleet(&sources)?;
        Ok(Self {
            sources,
            config,
            seed: None,
        })
    }

    /// Derive every source's drift from `seed` instead of OS entropy.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Run every source until `cancel` fires or the writer fails, then wait
    /// for all tasks to finish.
    pub async fn run<S>(self, sink: S, cancel: CancellationToken) -> Result<FleetReport>
    where
        S: PacketSink + 'static,
    {
        let (sender, writer) = frame_channel(sink, &self.config.writer);
        let writer_task = tokio::spawn(writer.run(cancel.clone()));

        let mut tasks = JoinSet::new();
        for (index, source) in self.sources.into_iter().enumerate() {
            let state = match self.seed {
                Some(seed) => {
                    let seed = seed.wrapping_add(index as u64);
                    DriftState::seeded(source, self.config.sequence, seed)
                }
                None => DriftState::new(source, self.config.sequence),
            };
            let sys_id = state.sys_id();
            let sender = sender.clone();
            let cancel = cancel.clone();
            let interval = self.config.interval;
            tasks.spawn(async move {
                let result = run_source(state, sender, interval, cancel).await;
                (sys_id, result)
            });
        }
        // The writer drains and exits once the last producer's sender is gone.
        drop(sender);
        info!(sources = tasks.len(), "fleet started");

        let mut sources = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((sys_id, Ok(frames_sent))) => sources.push(SourceOutcome {
                    sys_id,
                    frames_sent,
                    error: None,
                }),
                Ok((sys_id, Err((frames_sent, err)))) => {
                    warn!(sys_id, error = %err, "source stopped");
                    sources.push(SourceOutcome {
                        sys_id,
                        frames_sent,
                        error: Some(err.to_string()),
                    });
                }
                Err(err) => error!(error = %err, "source task panicked"),
            }
        }
        sources.sort_by_key(|s| s.sys_id);

        let (frames_written, writer_error) = match writer_task.await {
            Ok(Ok(written)) => (written, None),
            Ok(Err((written, err))) => (written, Some(err.to_string())),
            Err(err) => (0, Some(format!("writer task panicked: {err}"))),
        };

        info!(frames_written, "all workers stopped");
        Ok(FleetReport {
            sources,
            frames_written,
            writer_error,
        })
    }
}

/// One source: sample, encode, hand off, drift, wait for the next tick.
///
/// Returns the number of frames handed to the writer. An error carries the
/// count reached before it.
async fn run_source(
    mut state: DriftState,
    sender: FrameSender,
    interval: Duration,
    cancel: CancellationToken,
) -> std::result::Result<u64, (u64, GeneratorError)> {
    let sys_id = state.sys_id();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sent = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let sample = state.sample(unix_millis());
        let frame = encode_position(&sample, state.next_sequence());

        let delivered = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            delivered = sender.send(frame) => delivered,
        };
        if let Err(err) = delivered {
            if cancel.is_cancelled() {
                break;
            }
            return Err((sent, err));
        }
        sent += 1;
        debug!(sys_id, lat = sample.latitude, lon = sample.longitude, "frame queued");

        state.advance();
    }

    info!(sys_id, sent, "source shutting down cleanly");
    Ok(sent)
}
