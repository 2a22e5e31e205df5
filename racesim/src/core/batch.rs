use crate::core::handle_race::{handle_race, FrameHost};
use crate::core::scheduler::CancelHandle;
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::{reseed_racers, SimPars};
use anyhow::Context;
use helpers::general::mean;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::time::Duration;

/// BatchSummary aggregates the results of several independent races with the same racers.
/// * `no_runs` - Number of simulated races
/// * `wins` - Number of wins per racer id
/// * `t_finish_means` - (s) Mean finish time per racer id
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub no_runs: u32,
    pub wins: BTreeMap<String, u32>,
    pub t_finish_means: BTreeMap<String, f64>,
}

impl BatchSummary {
    fn new(results: &[RaceResult]) -> BatchSummary {
        let mut wins: BTreeMap<String, u32> = BTreeMap::new();
        let mut t_finishes_all: BTreeMap<String, Vec<f64>> = BTreeMap::new();

        for result in results.iter() {
            for (id, t_finish) in result.t_finishes.iter() {
                wins.entry(id.to_owned()).or_insert(0);
                t_finishes_all
                    .entry(id.to_owned())
                    .or_default()
                    .push(t_finish.as_secs_f64());
            }
            if let Some(winner) = result.winner() {
                *wins.entry(winner).or_insert(0) += 1;
            }
        }

        BatchSummary {
            no_runs: results.len() as u32,
            wins,
            t_finish_means: t_finishes_all
                .iter()
                .map(|(id, t_finishes)| (id.to_owned(), mean(t_finishes)))
                .collect(),
        }
    }

    /// print_summary prints win counts and mean finish times to the console output.
    pub fn print_summary(&self) {
        println!("RESULT: {} races", self.no_runs);
        println!("{:>10}, {:>6}, {:>10}", "id", "wins", "t_mean");
        for (id, wins) in self.wins.iter() {
            println!(
                "{:>10}, {:6}, {:9.3}s",
                id, wins, self.t_finish_means[id]
            );
        }
    }
}

/// run_batch simulates no_runs headless races in parallel. The racers of run i are re-seeded
/// from base_seed + i, i.e. the batch is reproducible.
pub fn run_batch(
    sim_pars: &SimPars,
    no_runs: u32,
    base_seed: u64,
    frame_interval: Duration,
) -> anyhow::Result<BatchSummary> {
    let results = (0..no_runs)
        .into_par_iter()
        .map(|run_idx| {
            let sim_pars_run = reseed_racers(sim_pars, base_seed.wrapping_add(run_idx as u64));
            handle_race(
                &sim_pars_run,
                frame_interval,
                FrameHost::Headless,
                (),
                &CancelHandle::new(),
            )?
            .context(format!("Race {} was cancelled unexpectedly!", run_idx))
        })
        .collect::<anyhow::Result<Vec<RaceResult>>>()?;

    Ok(BatchSummary::new(&results))
}
