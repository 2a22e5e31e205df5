use crate::core::racer::RacerPars;
use crate::interfaces::race_events::CompletionEvent;
use anyhow::Context;
use helpers::general::{argmax, argmin, max, mean, min};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::io::Write as IoWrite;
use std::path::Path;
use std::time::Duration;

/// RacerLabel is used to store racer id and display labels for post-processing the results.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RacerLabel {
    pub id: String,
    pub name: String,
    pub jockey_name: String,
}

/// (m/s) Speed statistics of a racer over the whole race.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
pub struct SpeedStats {
    pub max: f64,
    pub avg: f64,
    pub min: f64,
}

/// Highlights of a race: the racer with the highest top speed and the racer with the slowest
/// moment.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Highlights {
    pub top_speed: (String, f64),
    pub slowest_moment: (String, f64),
}

/// RaceResult contains all race information that is required for post-processing the results.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RaceResult {
    pub race_distance: f64,
    pub racer_labels: Vec<RacerLabel>,
    pub t_finishes: BTreeMap<String, Duration>,
    pub speed_histories: BTreeMap<String, Vec<f64>>,
}

impl RaceResult {
    pub fn new(
        completion_event: &CompletionEvent,
        racer_pars_all: &[RacerPars],
        race_distance: f64,
    ) -> RaceResult {
        let mut racer_labels: Vec<RacerLabel> = racer_pars_all
            .iter()
            .map(|racer_pars| RacerLabel {
                id: racer_pars.id.to_owned(),
                name: racer_pars.display_name().to_owned(),
                jockey_name: racer_pars.display_jockey_name().to_owned(),
            })
            .collect();
        racer_labels.sort_by(|a, b| a.id.cmp(&b.id));

        RaceResult {
            race_distance,
            racer_labels,
            t_finishes: completion_event.t_finishes.to_owned(),
            speed_histories: completion_event.speed_histories.to_owned(),
        }
    }

    /// standings returns the racer ids ordered by finish time, exact ties ordered by id.
    pub fn standings(&self) -> Vec<String> {
        CompletionEvent {
            t_finishes: self.t_finishes.to_owned(),
            speed_histories: BTreeMap::new(),
        }
        .finishing_order()
    }

    pub fn winner(&self) -> Option<String> {
        self.standings().into_iter().next()
    }

    pub fn get_label(&self, id: &str) -> Option<&RacerLabel> {
        self.racer_labels.iter().find(|label| label.id == id)
    }

    /// speed_stats returns max, average and min speed per racer. A racer without speed samples
    /// gets zeros.
    pub fn speed_stats(&self) -> BTreeMap<String, SpeedStats> {
        self.speed_histories
            .iter()
            .map(|(id, speeds)| {
                let stats = if speeds.is_empty() {
                    SpeedStats::default()
                } else {
                    SpeedStats {
                        max: max(speeds),
                        avg: mean(speeds),
                        min: min(speeds),
                    }
                };
                (id.to_owned(), stats)
            })
            .collect()
    }

    /// highlights returns None if no racer has any speed samples. Ties are resolved by id.
    pub fn highlights(&self) -> Option<Highlights> {
        let (ids, stats): (Vec<String>, Vec<SpeedStats>) = self
            .speed_stats()
            .into_iter()
            .filter(|(id, _)| !self.speed_histories[id].is_empty())
            .unzip();

        if ids.is_empty() {
            return None;
        }

        let max_speeds: Vec<f64> = stats.iter().map(|s| s.max).collect();
        let min_speeds: Vec<f64> = stats.iter().map(|s| s.min).collect();
        let idx_top = argmax(&max_speeds);
        let idx_slowest = argmin(&min_speeds);

        Some(Highlights {
            top_speed: (ids[idx_top].to_owned(), max_speeds[idx_top]),
            slowest_moment: (ids[idx_slowest].to_owned(), min_speeds[idx_slowest]),
        })
    }

    /// format_results creates the results table (finishing order, finish times, speed
    /// statistics) and the highlights.
    pub fn format_results(&self) -> anyhow::Result<String> {
        let speed_stats = self.speed_stats();
        let mut content = String::new();

        writeln!(&mut content, "RESULT: Race over {:.1}m", self.race_distance)?;
        writeln!(
            &mut content,
            "pos, {:>10}, {:>12}, {:>14}, {:>9}, {:>7}, {:>7}, {:>7}",
            "id", "name", "jockey", "t_finish", "v_max", "v_avg", "v_min"
        )?;

        for (pos, id) in self.standings().iter().enumerate() {
            let (name, jockey_name) = match self.get_label(id) {
                Some(label) => (label.name.as_str(), label.jockey_name.as_str()),
                None => (id.as_str(), ""),
            };
            let stats = speed_stats.get(id).copied().unwrap_or_default();

            writeln!(
                &mut content,
                "{:3}, {:>10}, {:>12}, {:>14}, {:8.3}s, {:7.2}, {:7.2}, {:7.2}",
                pos + 1,
                id,
                name,
                jockey_name,
                self.t_finishes[id].as_secs_f64(),
                stats.max,
                stats.avg,
                stats.min
            )?;
        }

        if let Some(highlights) = self.highlights() {
            writeln!(
                &mut content,
                "RESULT: Top speed {:.2}m/s by {}, slowest moment {:.2}m/s by {}",
                highlights.top_speed.1,
                highlights.top_speed.0,
                highlights.slowest_moment.1,
                highlights.slowest_moment.0
            )?;
        }

        Ok(content)
    }

    /// print_results prints the results table to the console output.
    pub fn print_results(&self) -> anyhow::Result<()> {
        print!("{}", self.format_results()?);
        Ok(())
    }

    /// write_results_to_file writes the results table to a text file.
    pub fn write_results_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let content = self.format_results()?;

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(path)
            .context(format!("Failed to open result file {}!", path.display()))?;
        file.write_all(content.as_bytes())?;
        file.flush()?;

        Ok(())
    }

    /// write_speed_histories_csv writes one row per tick and one column per racer. Racers that
    /// finished earlier leave their remaining cells empty.
    pub fn write_speed_histories_csv(&self, path: &Path) -> anyhow::Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .context(format!("Failed to create CSV file {}!", path.display()))?;

        let mut header = vec!["tick".to_owned()];
        header.extend(self.speed_histories.keys().cloned());
        writer.write_record(&header)?;

        let no_rows = self
            .speed_histories
            .values()
            .map(|speeds| speeds.len())
            .max()
            .unwrap_or(0);

        for row in 0..no_rows {
            let mut record = vec![(row + 1).to_string()];
            for speeds in self.speed_histories.values() {
                record.push(
                    speeds
                        .get(row)
                        .map(|v| format!("{:.6}", v))
                        .unwrap_or_default(),
                );
            }
            writer.write_record(&record)?;
        }

        writer
            .flush()
            .context(format!("Failed to write CSV file {}!", path.display()))?;
        Ok(())
    }
}
