use crate::core::race::RacePars;
use crate::core::racer::RacerPars;
use anyhow::Context;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::Path;

/// SimPars is used to store all other parameter structs.
#[derive(Debug, Deserialize, Clone)]
pub struct SimPars {
    #[serde(default)]
    pub race_pars: RacePars,
    pub racer_pars_all: Vec<RacerPars>,
}

/// read_sim_pars reads the JSON file and decodes the JSON string into the simulation parameters
/// struct.
pub fn read_sim_pars(filepath: &Path) -> anyhow::Result<SimPars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// (id, name, jockey name) of the computer-controlled opponents in the default lobby.
const AI_OPPONENTS: [(&str, &str, &str); 3] = [
    ("ai-0", "Rival", "Gallop Ghost"),
    ("ai-1", "Challenger", "Star Strider"),
    ("ai-2", "Maverick", "Night Runner"),
];

/// default_sim_pars creates the default lobby: the player and three AI opponents. If a seed is
/// given, the racers' noise seeds are derived from it (reproducible race), otherwise they are
/// drawn randomly.
pub fn default_sim_pars(player_name: &str, seed: Option<u64>) -> SimPars {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut racer_pars_all = vec![RacerPars {
        id: "player".to_owned(),
        seed: rng.gen::<f64>(),
        name: Some(player_name.to_owned()),
        jockey_name: None,
    }];

    for (id, name, jockey_name) in AI_OPPONENTS.iter() {
        racer_pars_all.push(RacerPars {
            id: id.to_string(),
            seed: rng.gen::<f64>(),
            name: Some(name.to_string()),
            jockey_name: Some(jockey_name.to_string()),
        });
    }

    SimPars {
        race_pars: RacePars::default(),
        racer_pars_all,
    }
}

/// reseed_racers returns a copy of the parameters with new noise seeds for all racers, derived
/// from the given seed.
pub fn reseed_racers(sim_pars: &SimPars, seed: u64) -> SimPars {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut sim_pars_new = sim_pars.to_owned();

    for racer_pars in sim_pars_new.racer_pars_all.iter_mut() {
        racer_pars.seed = rng.gen::<f64>();
    }

    sim_pars_new
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;

    #[test]
    fn test_read_sim_pars_with_defaults() {
        let filepath = std::env::temp_dir().join(format!(
            "racesim_pars_{}.json",
            std::process::id()
        ));
        let mut fh = std::fs::File::create(&filepath).unwrap();
        write!(
            fh,
            r#"{{
                "race_pars": {{ "race_distance": 100.0, "max_speed": 15.0 }},
                "racer_pars_all": [
                    {{ "id": "a", "seed": 0.5, "name": "Alpha" }},
                    {{ "id": "b", "seed": 0.25 }}
                ]
            }}"#
        )
        .unwrap();
        drop(fh);

        let sim_pars = read_sim_pars(&filepath).unwrap();
        std::fs::remove_file(&filepath).unwrap();

        assert_relative_eq!(sim_pars.race_pars.race_distance, 100.0);
        assert_relative_eq!(sim_pars.race_pars.max_speed, 15.0);
        assert_relative_eq!(sim_pars.race_pars.acceleration_factor, 2.0);
        assert_relative_eq!(sim_pars.race_pars.timestep_size, 1.0 / 60.0);
        assert_eq!(sim_pars.race_pars.broadcast_interval_ms, 100);
        assert_eq!(sim_pars.racer_pars_all.len(), 2);
        assert_eq!(sim_pars.racer_pars_all[0].display_name(), "Alpha");
        assert_eq!(sim_pars.racer_pars_all[1].jockey_name, None);
    }

    #[test]
    fn test_read_sim_pars_missing_file() {
        let err = read_sim_pars(Path::new("does/not/exist.json")).unwrap_err();
        assert!(format!("{}", err).contains("Failed to open parameter file"));
    }

    #[test]
    fn test_default_lobby() {
        let sim_pars = default_sim_pars("Player 1", Some(7));
        let ids: Vec<&str> = sim_pars
            .racer_pars_all
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["player", "ai-0", "ai-1", "ai-2"]);
        assert!(sim_pars
            .racer_pars_all
            .iter()
            .all(|r| (0.0..1.0).contains(&r.seed)));

        // same seed -> same lobby
        let sim_pars_b = default_sim_pars("Player 1", Some(7));
        for (a, b) in sim_pars.racer_pars_all.iter().zip(sim_pars_b.racer_pars_all.iter()) {
            assert_eq!(a.seed, b.seed);
        }
    }

    #[test]
    fn test_reseed_racers_keeps_labels() {
        let sim_pars = default_sim_pars("Player 1", Some(1));
        let sim_pars_new = reseed_racers(&sim_pars, 2);
        assert_eq!(sim_pars_new.racer_pars_all[1].name.as_deref(), Some("Rival"));
        assert_ne!(sim_pars_new.racer_pars_all[0].seed, sim_pars.racer_pars_all[0].seed);
    }
}
