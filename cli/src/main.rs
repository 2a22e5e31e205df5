use clap::Parser;
use racesim::core::batch::run_batch;
use racesim::core::handle_race::{frame_interval_from_rate, handle_race, FrameHost};
use racesim::core::scheduler::CancelHandle;
use racesim::interfaces::race_events::RaceEvent;
use racesim::post::race_result::RaceResult;
use racesim::pre::read_sim_pars::{default_sim_pars, read_sim_pars, SimPars};
use racesim::pre::sim_opts::SimOpts;
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

/// Sets up env_logger to print log records as "LEVEL: message" lines. RUST_LOG overrides the
/// level chosen by the debug flag.
fn init_logger(debug: bool) {
    env_logger::Builder::new()
        .filter_level(if debug {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_default_env()
        .target(env_logger::Target::Stdout)
        .format(|buf, record| {
            let label = match record.level() {
                log::Level::Warn => "WARNING".to_owned(),
                level => level.to_string(),
            };
            writeln!(buf, "{}: {}", label, record.args())
        })
        .init();
}

/// Runs the race on a separate thread and prints the live standings received over the channel.
fn run_realtime(
    sim_pars: &SimPars,
    frame_interval: Duration,
    realtime_factor: f64,
) -> anyhow::Result<Option<RaceResult>> {
    let (tx, rx) = flume::unbounded::<RaceEvent>();
    let sim_pars_thread = sim_pars.clone();
    let cancel_handle = CancelHandle::new();
    let cancel_handle_thread = cancel_handle.clone();

    let sim_thread = thread::spawn(move || {
        handle_race(
            &sim_pars_thread,
            frame_interval,
            FrameHost::Realtime { realtime_factor },
            tx,
            &cancel_handle_thread,
        )
    });

    for event in rx.iter() {
        match event {
            RaceEvent::Progress(snapshot) => {
                let standings: Vec<String> = snapshot
                    .standings()
                    .iter()
                    .map(|id| format!("{} {:5.1}%", id, snapshot.distance_percents[id]))
                    .collect();
                println!(
                    "{:7.2}s | {}",
                    snapshot.t_elapsed.as_secs_f64(),
                    standings.join(" | ")
                );
            }
            RaceEvent::Completed(completion_event) => {
                if let Some(winner) = completion_event.finishing_order().first() {
                    log::info!("We have a winner: {}", winner);
                }
                break;
            }
        }
    }

    // receiver is gone from here on, stop the simulator in case it is still running
    drop(rx);
    cancel_handle.cancel();

    sim_thread
        .join()
        .map_err(|_| anyhow::anyhow!("Simulation thread panicked!"))?
}

fn main() -> anyhow::Result<()> {
    // PRE-PROCESSING ------------------------------------------------------------------------------
    // get simulation options from the command line arguments
    let sim_opts: SimOpts = SimOpts::parse();
    init_logger(sim_opts.debug);

    // get simulation parameters
    let sim_pars = if let Some(parfile_path) = &sim_opts.parfile_path {
        log::info!("Reading simulation parameters from {:?}", parfile_path);
        read_sim_pars(parfile_path)?
    } else {
        log::info!("No parameter file provided, using the default lobby");
        default_sim_pars(&sim_opts.player_name, sim_opts.seed)
    };
    let frame_interval = frame_interval_from_rate(sim_opts.frame_rate)?;

    // print race details
    log::info!(
        "Simulating {} racers over {:.1}m with a time step size of {:.4}s",
        sim_pars.racer_pars_all.len(),
        sim_pars.race_pars.race_distance,
        sim_pars.race_pars.timestep_size
    );
    for racer_pars in sim_pars.racer_pars_all.iter() {
        log::debug!(
            "Racer {} ({}, ridden by {}) with seed {:.6}",
            racer_pars.id,
            racer_pars.display_name(),
            racer_pars.display_jockey_name(),
            racer_pars.seed
        );
    }

    // EXECUTION -----------------------------------------------------------------------------------
    let t_start = Instant::now();

    let race_result = if sim_opts.realtime {
        log::info!("Running real-time simulation...");
        run_realtime(&sim_pars, frame_interval, sim_opts.realtime_factor)?
    } else if sim_opts.no_sim_runs > 1 {
        log::info!("Running {} simulations in parallel...", sim_opts.no_sim_runs);
        let base_seed = sim_opts.seed.unwrap_or_else(rand::random);
        let summary = run_batch(&sim_pars, sim_opts.no_sim_runs, base_seed, frame_interval)?;
        log::info!("Execution time: {}ms", t_start.elapsed().as_millis());
        summary.print_summary();
        return Ok(());
    } else {
        handle_race(
            &sim_pars,
            frame_interval,
            FrameHost::Headless,
            (),
            &CancelHandle::new(),
        )?
    };

    log::info!("Execution time: {}ms", t_start.elapsed().as_millis());

    // POST-PROCESSING -----------------------------------------------------------------------------
    let race_result = match race_result {
        Some(race_result) => race_result,
        None => {
            log::warn!("Race was cancelled, no results available");
            return Ok(());
        }
    };

    race_result.print_results()?;
    if let Some(results_path) = &sim_opts.results_path {
        race_result.write_results_to_file(results_path)?;
        log::info!("Results written to {:?}", results_path);
    }

    if let Some(output_path) = &sim_opts.output_path {
        race_result.write_speed_histories_csv(output_path)?;
        log::info!("Speed histories written to {:?}", output_path);
    }

    Ok(())
}
