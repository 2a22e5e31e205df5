use crate::core::noise::ValueNoise;
use crate::core::race::RacePars;
use serde::Deserialize;
use std::time::Duration;

/// * `id` - Unique racer identifier, e.g. ai-0
/// * `seed` - Seed of the racer's noise field, determines its whole speed profile
/// * `name` - (OPTIONAL) Display name of the racer
/// * `jockey_name` - (OPTIONAL) Display name of the jockey, e.g. as created by a name generator
#[derive(Debug, Deserialize, Clone)]
pub struct RacerPars {
    pub id: String,
    pub seed: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub jockey_name: Option<String>,
}

pub const DEFAULT_JOCKEY_NAME: &str = "Speedy Steed";

impl RacerPars {
    pub fn new(id: &str, seed: f64) -> RacerPars {
        RacerPars {
            id: id.to_owned(),
            seed,
            name: None,
            jockey_name: None,
        }
    }

    /// Display name, falls back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Jockey label, falls back to the default jockey name if the name generator did not
    /// deliver one.
    pub fn display_jockey_name(&self) -> &str {
        self.jockey_name.as_deref().unwrap_or(DEFAULT_JOCKEY_NAME)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RacerStatus {
    NotStarted,
    Running,
    Finished,
}

/// Racer holds the complete simulation state of a single racer. The state is only changed by
/// tick(), which is called once per simulation step.
#[derive(Debug, Clone)]
pub struct Racer {
    pub id: String,
    pub seed: f64,
    noise: ValueNoise,
    status: RacerStatus,
    t_noise: f64, // private sampling clock of the noise field
    distance: f64,
    speed: f64,
    speed_history: Vec<f64>,
    t_finish: Option<Duration>,
}

impl Racer {
    pub fn new(racer_pars: &RacerPars) -> Racer {
        Racer {
            id: racer_pars.id.to_owned(),
            seed: racer_pars.seed,
            noise: ValueNoise::new(racer_pars.seed),
            status: RacerStatus::NotStarted,
            t_noise: 0.0,
            distance: 0.0,
            speed: 0.0,
            speed_history: Vec::new(),
            t_finish: None,
        }
    }

    /// tick advances the racer by one fixed time step. The noise clock advances by a constant
    /// increment, independent of the wall time, such that the motion is reproducible. The wall
    /// time is only used to stamp the finish time. Returns true if the racer crossed the finish
    /// line in this tick.
    pub fn tick(&mut self, race_pars: &RacePars, t_elapsed: Duration) -> bool {
        if self.status == RacerStatus::Finished {
            return false;
        }
        self.status = RacerStatus::Running;

        self.t_noise += race_pars.noise_clock_increment;
        let target_speed = self.noise.sample(self.t_noise) * race_pars.max_speed;

        self.speed += (target_speed - self.speed)
            * race_pars.acceleration_factor
            * race_pars.timestep_size;
        self.speed = self.speed.max(0.0).min(race_pars.max_speed);

        self.distance += self.speed * race_pars.timestep_size;
        self.speed_history.push(self.speed);

        if self.distance >= race_pars.race_distance {
            self.status = RacerStatus::Finished;
            self.t_finish = Some(t_elapsed);
            return true;
        }
        false
    }

    pub fn get_status(&self) -> RacerStatus {
        self.status
    }

    pub fn get_finished(&self) -> bool {
        self.status == RacerStatus::Finished
    }

    pub fn get_distance(&self) -> f64 {
        self.distance
    }

    pub fn get_speed(&self) -> f64 {
        self.speed
    }

    pub fn get_t_noise(&self) -> f64 {
        self.t_noise
    }

    pub fn get_speed_history(&self) -> &[f64] {
        &self.speed_history
    }

    pub fn get_t_finish(&self) -> Option<Duration> {
        self.t_finish
    }
}
