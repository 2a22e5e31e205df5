//! Events handed out by the scheduler. Observers only ever receive copies of the race state.

use anyhow::Context;
use flume::Sender;
use helpers::general::{argsort, SortOrder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_BROADCAST_INTERVAL_MS: u64 = 100;

/// ProgressSnapshot is a point-in-time copy of the race progress.
/// * `t_elapsed` - Wall time since race start
/// * `distance_percents` - (%) Covered share of the race distance per racer, capped at 100
/// * `speeds` - (m/s) Current speed per racer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub t_elapsed: Duration,
    pub distance_percents: BTreeMap<String, f64>,
    pub speeds: BTreeMap<String, f64>,
}

impl ProgressSnapshot {
    /// standings returns the racer ids ordered by progress (leader first). Racers with equal
    /// progress are ordered by ascending id.
    pub fn standings(&self) -> Vec<String> {
        let ids: Vec<&String> = self.distance_percents.keys().collect();
        let percents: Vec<f64> = self.distance_percents.values().copied().collect();

        argsort(&percents, SortOrder::Descending)
            .into_iter()
            .map(|idx| ids[idx].to_owned())
            .collect()
    }
}

/// CompletionEvent is sent exactly once per race, after the last racer finished.
/// * `t_finishes` - Wall time since race start at which each racer crossed the finish line
/// * `speed_histories` - (m/s) Speed of each racer after every tick
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionEvent {
    pub t_finishes: BTreeMap<String, Duration>,
    pub speed_histories: BTreeMap<String, Vec<f64>>,
}

impl CompletionEvent {
    /// finishing_order returns the racer ids ordered by finish time. Racers that finished in the
    /// same tick are ordered by ascending id.
    pub fn finishing_order(&self) -> Vec<String> {
        let ids: Vec<&String> = self.t_finishes.keys().collect();
        let t_finishes: Vec<Duration> = self.t_finishes.values().copied().collect();

        argsort(&t_finishes, SortOrder::Ascending)
            .into_iter()
            .map(|idx| ids[idx].to_owned())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum RaceEvent {
    Progress(ProgressSnapshot),
    Completed(CompletionEvent),
}

/// RaceObserver is implemented by everything that consumes race events, e.g. a rendering layer
/// or a standings display.
pub trait RaceObserver {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> anyhow::Result<()>;
    fn on_completion(&mut self, event: &CompletionEvent) -> anyhow::Result<()>;
}

impl<O: RaceObserver + ?Sized> RaceObserver for &mut O {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        (**self).on_progress(snapshot)
    }

    fn on_completion(&mut self, event: &CompletionEvent) -> anyhow::Result<()> {
        (**self).on_completion(event)
    }
}

/// Forwards the events to another thread.
impl RaceObserver for Sender<RaceEvent> {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        self.send(RaceEvent::Progress(snapshot.to_owned()))
            .context("Failed to send progress snapshot!")
    }

    fn on_completion(&mut self, event: &CompletionEvent) -> anyhow::Result<()> {
        self.send(RaceEvent::Completed(event.to_owned()))
            .context("Failed to send race completion event!")
    }
}

/// Collects the events, e.g. for evaluation after the race.
impl RaceObserver for Vec<RaceEvent> {
    fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        self.push(RaceEvent::Progress(snapshot.to_owned()));
        Ok(())
    }

    fn on_completion(&mut self, event: &CompletionEvent) -> anyhow::Result<()> {
        self.push(RaceEvent::Completed(event.to_owned()));
        Ok(())
    }
}

/// Discards all events (batch runs).
impl RaceObserver for () {
    fn on_progress(&mut self, _snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_completion(&mut self, _event: &CompletionEvent) -> anyhow::Result<()> {
        Ok(())
    }
}
