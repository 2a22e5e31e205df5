//! Frame-driven scheduling of a race.
//!
//! The host (an event loop, a timer, a render loop) calls `Scheduler::on_frame` once per frame
//! with its current timestamp. Every call performs exactly one fixed simulation step, no matter
//! how much wall time passed since the previous frame, so the motion does not depend on the
//! host's frame rate. Only the finish times and the broadcast throttling use the timestamps.

use crate::core::race::Race;
use crate::interfaces::race_events::{CompletionEvent, RaceObserver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What the host should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Call on_frame() again on the next frame.
    Reschedule,
    /// The race is completed, the completion event was sent.
    Completed,
    /// The scheduler was cancelled, no further frames are needed.
    Cancelled,
}

/// CancelHandle deregisters a scheduler from its host. Cancellation is polled at the start of a
/// frame and before rescheduling, a running simulation step is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> CancelHandle {
        CancelHandle::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst)
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
pub struct Scheduler<O: RaceObserver> {
    race: Race,
    observer: O,
    broadcast_interval: Duration,
    t_start: Option<Duration>,
    t_last_broadcast: Duration,
    cancel_handle: CancelHandle,
    pending_completion: Option<CompletionEvent>,
    stopped: Option<FrameOutcome>,
}

impl<O: RaceObserver> Scheduler<O> {
    pub fn new(race: Race, observer: O) -> Scheduler<O> {
        Scheduler::with_cancel_handle(race, observer, CancelHandle::new())
    }

    /// with_cancel_handle is used if the handle must be distributed before the scheduler is
    /// handed to its host.
    pub fn with_cancel_handle(race: Race, observer: O, cancel_handle: CancelHandle) -> Scheduler<O> {
        let broadcast_interval = Duration::from_millis(race.race_pars.broadcast_interval_ms);

        Scheduler {
            race,
            observer,
            broadcast_interval,
            t_start: None,
            t_last_broadcast: Duration::ZERO,
            cancel_handle,
            pending_completion: None,
            stopped: None,
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel_handle.clone()
    }

    pub fn get_race(&self) -> &Race {
        &self.race
    }

    pub fn get_observer(&self) -> &O {
        &self.observer
    }

    pub fn into_parts(self) -> (Race, O) {
        (self.race, self.observer)
    }

    /// on_frame handles a single frame callback. timestamp is the host's clock, it must not
    /// decrease between calls.
    ///
    /// The sequence within a frame is fixed: simulation step, progress broadcast (if the
    /// broadcast interval elapsed), completion event (if the last racer finished), reschedule.
    ///
    /// If the observer fails in the completion frame, the completion event stays pending and is
    /// sent again on the next frame without another simulation step.
    pub fn on_frame(&mut self, timestamp: Duration) -> anyhow::Result<FrameOutcome> {
        if let Some(outcome) = self.stopped {
            return Ok(outcome);
        }
        if self.cancel_handle.is_cancelled() {
            return Ok(self.stop(FrameOutcome::Cancelled));
        }
        if self.pending_completion.is_some() {
            return self.send_completion();
        }

        // the first frame only marks the race start
        let t_start = match self.t_start {
            Some(t_start) => t_start,
            None => {
                self.t_start = Some(timestamp);
                self.t_last_broadcast = timestamp;
                log::info!(
                    "Race started with {} racers over {:.1}m",
                    self.race.racers().count(),
                    self.race.race_pars.race_distance
                );
                self.observer
                    .on_progress(&self.race.get_progress_snapshot())?;
                return Ok(self.reschedule());
            }
        };

        self.pending_completion = self
            .race
            .simulate_timestep(timestamp.saturating_sub(t_start));

        if timestamp.saturating_sub(self.t_last_broadcast) >= self.broadcast_interval {
            self.t_last_broadcast = timestamp;
            self.observer
                .on_progress(&self.race.get_progress_snapshot())?;
        }

        self.send_completion()
    }

    fn send_completion(&mut self) -> anyhow::Result<FrameOutcome> {
        if let Some(completion_event) = &self.pending_completion {
            self.observer.on_completion(completion_event)?;
            self.pending_completion = None;
            return Ok(self.stop(FrameOutcome::Completed));
        }
        Ok(self.reschedule())
    }

    fn reschedule(&mut self) -> FrameOutcome {
        if self.cancel_handle.is_cancelled() {
            return self.stop(FrameOutcome::Cancelled);
        }
        FrameOutcome::Reschedule
    }

    fn stop(&mut self, outcome: FrameOutcome) -> FrameOutcome {
        if outcome == FrameOutcome::Cancelled {
            log::info!(
                "Race cancelled after {} ticks",
                self.race.get_cur_tick()
            );
        }
        self.stopped = Some(outcome);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::race::RacePars;
    use crate::core::racer::RacerPars;
    use crate::interfaces::race_events::{ProgressSnapshot, RaceEvent};

    /// Collects the events like Vec<RaceEvent> but refuses the first no_failures completion
    /// events.
    #[derive(Debug, Default)]
    struct FlakyObserver {
        events: Vec<RaceEvent>,
        no_failures: u32,
    }

    impl RaceObserver for FlakyObserver {
        fn on_progress(&mut self, snapshot: &ProgressSnapshot) -> anyhow::Result<()> {
            self.events.on_progress(snapshot)
        }

        fn on_completion(&mut self, event: &CompletionEvent) -> anyhow::Result<()> {
            if self.no_failures > 0 {
                self.no_failures -= 1;
                anyhow::bail!("Consumer is not ready!");
            }
            self.events.on_completion(event)
        }
    }

    fn create_scheduler(seeds: &[f64]) -> Scheduler<Vec<RaceEvent>> {
        let race_pars = RacePars {
            race_distance: 100.0,
            ..RacePars::default()
        };
        let racers: Vec<RacerPars> = seeds
            .iter()
            .enumerate()
            .map(|(i, &seed)| RacerPars::new(&format!("r{}", i), seed))
            .collect();
        Scheduler::new(Race::new(&race_pars, &racers).unwrap(), Vec::new())
    }

    /// Runs the scheduler with the given (repeating) frame durations until it stops.
    fn run(scheduler: &mut Scheduler<Vec<RaceEvent>>, frame_durations_ms: &[u64]) -> FrameOutcome {
        let mut timestamp = Duration::from_millis(1234);
        let mut i = 0;
        loop {
            let outcome = scheduler.on_frame(timestamp).unwrap();
            if outcome != FrameOutcome::Reschedule {
                return outcome;
            }
            timestamp += Duration::from_millis(frame_durations_ms[i % frame_durations_ms.len()]);
            i += 1;
            assert!(i < 1_000_000, "Scheduler did not stop!");
        }
    }

    fn progress_snapshots(events: &[RaceEvent]) -> Vec<&ProgressSnapshot> {
        events
            .iter()
            .filter_map(|event| match event {
                RaceEvent::Progress(snapshot) => Some(snapshot),
                _ => None,
            })
            .collect()
    }

    fn completion_events(events: &[RaceEvent]) -> Vec<&CompletionEvent> {
        events
            .iter()
            .filter_map(|event| match event {
                RaceEvent::Completed(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_first_frame_only_starts() {
        let mut scheduler = create_scheduler(&[0.1, 0.2]);
        let outcome = scheduler.on_frame(Duration::from_secs(5)).unwrap();

        assert_eq!(outcome, FrameOutcome::Reschedule);
        assert_eq!(scheduler.get_race().get_cur_tick(), 0);
        assert!(scheduler.get_race().racers().all(|r| r.get_distance() == 0.0));
        assert_eq!(progress_snapshots(scheduler.get_observer()).len(), 1);

        scheduler.on_frame(Duration::from_millis(5016)).unwrap();
        assert_eq!(scheduler.get_race().get_cur_tick(), 1);
    }

    #[test]
    fn test_one_tick_per_frame_regardless_of_gap() {
        let mut scheduler = create_scheduler(&[0.1, 0.2]);
        scheduler.on_frame(Duration::ZERO).unwrap();
        // a huge gap between frames is not caught up
        scheduler.on_frame(Duration::from_secs(3)).unwrap();
        assert_eq!(scheduler.get_race().get_cur_tick(), 1);
        assert_eq!(scheduler.get_race().get_t_elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn test_snapshot_spacing_with_jittered_frames() {
        let mut scheduler = create_scheduler(&[0.1, 0.5, 0.9]);
        let outcome = run(&mut scheduler, &[5, 40, 16, 90, 1, 33, 120, 7]);
        assert_eq!(outcome, FrameOutcome::Completed);

        let snapshots = progress_snapshots(scheduler.get_observer());
        assert!(snapshots.len() > 10);
        for pair in snapshots.windows(2) {
            assert!(pair[1].t_elapsed - pair[0].t_elapsed >= Duration::from_millis(100));
        }
        for snapshot in snapshots.iter() {
            assert!(snapshot.distance_percents.values().all(|&p| (0.0..=100.0).contains(&p)));
        }
    }

    #[test]
    fn test_completion_emitted_once_and_last() {
        let mut scheduler = create_scheduler(&[0.3, 0.6]);
        assert_eq!(run(&mut scheduler, &[16]), FrameOutcome::Completed);

        // further frames neither tick nor emit anything
        let cur_tick = scheduler.get_race().get_cur_tick();
        let no_events = scheduler.get_observer().len();
        for i in 0..5 {
            let outcome = scheduler.on_frame(Duration::from_secs(100 + i)).unwrap();
            assert_eq!(outcome, FrameOutcome::Completed);
        }
        assert_eq!(scheduler.get_race().get_cur_tick(), cur_tick);

        let events = scheduler.get_observer();
        assert_eq!(events.len(), no_events);
        assert_eq!(completion_events(events).len(), 1);
        assert!(matches!(events.last(), Some(RaceEvent::Completed(_))));
    }

    #[test]
    fn test_motion_independent_of_frame_rate() {
        let mut scheduler_fast = create_scheduler(&[0.3, 0.6]);
        let mut scheduler_slow = create_scheduler(&[0.3, 0.6]);
        run(&mut scheduler_fast, &[7]);
        run(&mut scheduler_slow, &[16, 50, 33]);

        let (race_fast, events_fast) = scheduler_fast.into_parts();
        let (race_slow, events_slow) = scheduler_slow.into_parts();
        assert_eq!(race_fast.get_cur_tick(), race_slow.get_cur_tick());

        let completion_fast = completion_events(&events_fast)[0];
        let completion_slow = completion_events(&events_slow)[0];
        assert_eq!(completion_fast.speed_histories, completion_slow.speed_histories);
        assert_eq!(
            completion_fast.finishing_order(),
            completion_slow.finishing_order()
        );
        // finish times are wall times and therefore differ
        assert!(completion_fast.t_finishes["r0"] < completion_slow.t_finishes["r0"]);
    }

    #[test]
    fn test_finish_time_is_wall_time_since_start() {
        let mut scheduler = create_scheduler(&[0.5, 0.25]);
        run(&mut scheduler, &[20]);
        let events = scheduler.get_observer();
        let completion_event = completion_events(events)[0];

        // seed 0.5 finishes 100m in tick 596, i.e. 596 frames after the start frame
        assert_eq!(completion_event.t_finishes["r0"], Duration::from_millis(596 * 20));
        assert_eq!(completion_event.t_finishes["r1"], Duration::from_millis(580 * 20));
    }

    #[test]
    fn test_cancel_before_frame() {
        let mut scheduler = create_scheduler(&[0.3, 0.6]);
        let cancel_handle = scheduler.cancel_handle();
        scheduler.on_frame(Duration::ZERO).unwrap();
        scheduler.on_frame(Duration::from_millis(16)).unwrap();

        cancel_handle.cancel();
        let outcome = scheduler.on_frame(Duration::from_millis(32)).unwrap();
        assert_eq!(outcome, FrameOutcome::Cancelled);
        assert_eq!(scheduler.get_race().get_cur_tick(), 1);
        assert!(completion_events(scheduler.get_observer()).is_empty());

        // stays cancelled
        let outcome = scheduler.on_frame(Duration::from_millis(48)).unwrap();
        assert_eq!(outcome, FrameOutcome::Cancelled);
        assert_eq!(scheduler.get_race().get_cur_tick(), 1);
    }

    #[test]
    fn test_cancel_from_other_thread() {
        let race_pars = RacePars::default();
        let racers = [RacerPars::new("a", 0.1), RacerPars::new("b", 0.2)];
        let cancel_handle = CancelHandle::new();
        let mut scheduler = Scheduler::with_cancel_handle(
            Race::new(&race_pars, &racers).unwrap(),
            (),
            cancel_handle.clone(),
        );

        std::thread::spawn(move || cancel_handle.cancel())
            .join()
            .unwrap();

        let outcome = scheduler.on_frame(Duration::ZERO).unwrap();
        assert_eq!(outcome, FrameOutcome::Cancelled);
        assert_eq!(scheduler.get_race().get_cur_tick(), 0);
    }

    #[test]
    fn test_completion_resent_after_observer_failure() {
        let race_pars = RacePars {
            race_distance: 100.0,
            ..RacePars::default()
        };
        let racers = [RacerPars::new("r0", 0.3), RacerPars::new("r1", 0.6)];
        let observer = FlakyObserver {
            no_failures: 2,
            ..FlakyObserver::default()
        };
        let mut scheduler = Scheduler::new(Race::new(&race_pars, &racers).unwrap(), observer);

        let mut timestamp = Duration::ZERO;
        let mut no_errors = 0;
        let outcome = loop {
            match scheduler.on_frame(timestamp) {
                Ok(FrameOutcome::Reschedule) => {}
                Ok(outcome) => break outcome,
                Err(_) => no_errors += 1,
            }
            timestamp += Duration::from_millis(16);
            assert!(timestamp < Duration::from_secs(1000), "Scheduler did not stop!");
        };

        assert_eq!(outcome, FrameOutcome::Completed);
        assert_eq!(no_errors, 2);
        assert!(scheduler.get_race().get_completed());

        // the retries did not simulate any further
        let cur_tick = scheduler.get_race().get_cur_tick();
        assert_eq!(
            scheduler.on_frame(timestamp + Duration::from_secs(1)).unwrap(),
            FrameOutcome::Completed
        );
        assert_eq!(scheduler.get_race().get_cur_tick(), cur_tick);

        let events = &scheduler.get_observer().events;
        assert_eq!(completion_events(events).len(), 1);
        assert!(matches!(events.last(), Some(RaceEvent::Completed(_))));
    }
}
