use crate::core::handle_race::DEFAULT_FRAME_RATE;
use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(
    version = "0.1.0",
    author = "Alexander Heilmeier <alexander.heilmeier@tum.de>",
    name = "RS-ND",
    about = "A noise-driven race simulator written in Rust"
)]
pub struct SimOpts {
    // FLAGS ---------------------------------------------------------------------------------------
    /// Activate debug printing
    #[clap(short, long)]
    pub debug: bool,

    /// Activate real-time mode - frames are paced by the wall clock and the live standings are
    /// printed
    #[clap(short, long)]
    pub realtime: bool,

    // OPTIONS -------------------------------------------------------------------------------------
    /// Set number of simulation runs (only for non-real-time mode, ignored in real-time mode)
    #[clap(short, long, default_value = "1")]
    pub no_sim_runs: u32,

    /// Set path to the simulation parameter file (OPTIONAL: if not set, uses the default lobby)
    #[clap(short, long)]
    pub parfile_path: Option<PathBuf>,

    /// Set the player's name in the default lobby
    #[clap(long, default_value = "Player 1")]
    pub player_name: String,

    /// Set seed for the racers' noise seeds (OPTIONAL: if not set, seeds are drawn randomly)
    #[clap(short, long)]
    pub seed: Option<u64>,

    /// Set real-time factor (only relevant in real-time mode)
    #[clap(short = 'f', long, default_value = "1.0")]
    pub realtime_factor: f64,

    /// Set host frame rate in Hz, i.e. how often the scheduler is called
    #[clap(long, default_value_t = DEFAULT_FRAME_RATE)]
    pub frame_rate: f64,

    /// Set path of the text file the results are written to (OPTIONAL: results are only printed
    /// if not set)
    #[clap(long)]
    pub results_path: Option<PathBuf>,

    /// Set path of the CSV file the speed histories are written to (OPTIONAL)
    #[clap(short, long)]
    pub output_path: Option<PathBuf>,
}
