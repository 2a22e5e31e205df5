use crate::core::racer::{Racer, RacerPars};
use crate::interfaces::race_events::{
    CompletionEvent, ProgressSnapshot, DEFAULT_BROADCAST_INTERVAL_MS,
};
use anyhow::Context;
use helpers::general::InputValueError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// A race needs at least this many racers.
pub const MIN_NO_RACERS: usize = 2;

/// * `race_distance` - (m) Distance from start to finish line
/// * `max_speed` - (m/s) Maximum speed of every racer
/// * `acceleration_factor` - (1/s) Rate at which the speed approaches the target speed
/// * `timestep_size` - (s) Fixed simulation time step, applied per tick regardless of wall time
/// * `broadcast_interval_ms` - (ms) Minimum wall time between two progress snapshots
/// * `noise_clock_increment` - Advance of the racers' noise sampling clocks per tick
#[derive(Debug, Deserialize, Clone)]
pub struct RacePars {
    #[serde(default = "default_race_distance")]
    pub race_distance: f64,
    #[serde(default = "default_max_speed")]
    pub max_speed: f64,
    #[serde(default = "default_acceleration_factor")]
    pub acceleration_factor: f64,
    #[serde(default = "default_timestep_size")]
    pub timestep_size: f64,
    #[serde(default = "default_broadcast_interval_ms")]
    pub broadcast_interval_ms: u64,
    #[serde(default = "default_noise_clock_increment")]
    pub noise_clock_increment: f64,
}

fn default_race_distance() -> f64 {
    400.0
}

fn default_max_speed() -> f64 {
    20.0
}

fn default_acceleration_factor() -> f64 {
    2.0
}

fn default_timestep_size() -> f64 {
    1.0 / 60.0
}

fn default_broadcast_interval_ms() -> u64 {
    DEFAULT_BROADCAST_INTERVAL_MS
}

fn default_noise_clock_increment() -> f64 {
    0.1
}

impl Default for RacePars {
    fn default() -> Self {
        RacePars {
            race_distance: default_race_distance(),
            max_speed: default_max_speed(),
            acceleration_factor: default_acceleration_factor(),
            timestep_size: default_timestep_size(),
            broadcast_interval_ms: default_broadcast_interval_ms(),
            noise_clock_increment: default_noise_clock_increment(),
        }
    }
}

impl RacePars {
    /// check_pars makes sure that the race can be simulated with the given parameters and that
    /// it terminates.
    pub fn check_pars(&self) -> anyhow::Result<()> {
        if !(self.race_distance.is_finite() && self.race_distance > 0.0) {
            return Err(InputValueError).context(format!(
                "Race distance must be finite and positive, but is {}!",
                self.race_distance
            ));
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(InputValueError).context(format!(
                "Maximum speed must be finite and positive, but is {}!",
                self.max_speed
            ));
        }
        // without acceleration the racers never leave the start
        if !(self.acceleration_factor.is_finite() && self.acceleration_factor > 0.0) {
            return Err(InputValueError).context(format!(
                "Acceleration factor must be finite and positive, but is {}!",
                self.acceleration_factor
            ));
        }
        if !(self.timestep_size.is_finite() && self.timestep_size > 0.0) {
            return Err(InputValueError).context(format!(
                "Time step size must be finite and positive, but is {}!",
                self.timestep_size
            ));
        }
        if !(self.noise_clock_increment.is_finite() && self.noise_clock_increment > 0.0) {
            return Err(InputValueError).context(format!(
                "Noise clock increment must be finite and positive, but is {}!",
                self.noise_clock_increment
            ));
        }
        Ok(())
    }
}

/// Race owns the state of all racers. It is advanced exclusively via simulate_timestep() and
/// hands out copies (snapshots, completion event) only.
#[derive(Debug, Clone)]
pub struct Race {
    pub race_pars: RacePars,
    racers: BTreeMap<String, Racer>,
    t_elapsed: Duration,
    cur_tick: u64,
    completed: bool,
}

impl Race {
    pub fn new(race_pars: &RacePars, racer_pars_all: &[RacerPars]) -> anyhow::Result<Race> {
        race_pars.check_pars()?;

        if racer_pars_all.len() < MIN_NO_RACERS {
            return Err(InputValueError).context(format!(
                "A race requires at least {} racers, but {} were inserted!",
                MIN_NO_RACERS,
                racer_pars_all.len()
            ));
        }

        // create racers
        let mut racers = BTreeMap::new();

        for racer_pars in racer_pars_all.iter() {
            if racer_pars.id.is_empty() {
                return Err(InputValueError).context("Racer ids must not be empty!");
            }
            if !racer_pars.seed.is_finite() {
                return Err(InputValueError).context(format!(
                    "Seed of racer {} must be finite, but is {}!",
                    racer_pars.id, racer_pars.seed
                ));
            }
            if racers
                .insert(racer_pars.id.to_owned(), Racer::new(racer_pars))
                .is_some()
            {
                return Err(InputValueError)
                    .context(format!("Racer id {} is not unique!", racer_pars.id));
            }
        }

        Ok(Race {
            race_pars: race_pars.to_owned(),
            racers,
            t_elapsed: Duration::ZERO,
            cur_tick: 0,
            completed: false,
        })
    }

    // ---------------------------------------------------------------------------------------------
    // MAIN METHOD ---------------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    /// simulate_timestep advances every racer by one fixed time step. t_elapsed is the wall time
    /// since race start, it is only used to stamp finish times. The racers do not depend on each
    /// other within a step, i.e. the update order does not influence the result.
    ///
    /// Returns the completion event in the step in which the last racer finished. A completed
    /// race is not simulated anymore.
    pub fn simulate_timestep(&mut self, t_elapsed: Duration) -> Option<CompletionEvent> {
        if self.completed {
            return None;
        }

        self.t_elapsed = t_elapsed;
        self.cur_tick += 1;

        for racer in self.racers.values_mut() {
            if racer.tick(&self.race_pars, t_elapsed) {
                log::debug!(
                    "Racer {} finished after {:.3}s (tick {})",
                    racer.id,
                    t_elapsed.as_secs_f64(),
                    self.cur_tick
                );
            }
        }

        self.check_completion()
    }

    /// tick_racer advances a single racer by one fixed time step. Ticking a racer that is not
    /// part of the race is a programming error upstream and therefore panics.
    ///
    /// The tick counter only counts full time steps, i.e. it is not incremented here.
    pub fn tick_racer(&mut self, id: &str, t_elapsed: Duration) -> Option<CompletionEvent> {
        if self.completed {
            return None;
        }

        let racer = self
            .racers
            .get_mut(id)
            .unwrap_or_else(|| panic!("Tried to tick racer {} which is not part of the race!", id));

        self.t_elapsed = t_elapsed;
        racer.tick(&self.race_pars, t_elapsed);

        self.check_completion()
    }

    // ---------------------------------------------------------------------------------------------
    // METHODS (HELPERS) ---------------------------------------------------------------------------
    // ---------------------------------------------------------------------------------------------

    fn check_completion(&mut self) -> Option<CompletionEvent> {
        if !self.get_all_finished() {
            return None;
        }
        self.completed = true;
        log::info!(
            "Race completed after {} ticks ({:.3}s)",
            self.cur_tick,
            self.t_elapsed.as_secs_f64()
        );
        self.get_completion_event()
    }

    pub fn get_all_finished(&self) -> bool {
        self.racers.values().all(|racer| racer.get_finished())
    }

    pub fn get_completed(&self) -> bool {
        self.completed
    }

    pub fn get_t_elapsed(&self) -> Duration {
        self.t_elapsed
    }

    pub fn get_cur_tick(&self) -> u64 {
        self.cur_tick
    }

    pub fn get_racer(&self, id: &str) -> Option<&Racer> {
        self.racers.get(id)
    }

    /// Racers in ascending id order.
    pub fn racers(&self) -> impl Iterator<Item = &Racer> {
        self.racers.values()
    }

    pub fn get_progress_snapshot(&self) -> ProgressSnapshot {
        let mut snapshot = ProgressSnapshot {
            t_elapsed: self.t_elapsed,
            ..ProgressSnapshot::default()
        };

        for (id, racer) in self.racers.iter() {
            let distance_percent =
                (racer.get_distance() / self.race_pars.race_distance * 100.0).min(100.0);
            snapshot
                .distance_percents
                .insert(id.to_owned(), distance_percent);
            snapshot.speeds.insert(id.to_owned(), racer.get_speed());
        }

        snapshot
    }

    /// get_completion_event returns the final result, None while the race is still running.
    pub fn get_completion_event(&self) -> Option<CompletionEvent> {
        if !self.completed {
            return None;
        }

        let mut event = CompletionEvent::default();
        for (id, racer) in self.racers.iter() {
            event.t_finishes.insert(
                id.to_owned(),
                racer
                    .get_t_finish()
                    .expect("Completed race contains a racer without finish time!"),
            );
            event
                .speed_histories
                .insert(id.to_owned(), racer.get_speed_history().to_vec());
        }

        Some(event)
    }
}
