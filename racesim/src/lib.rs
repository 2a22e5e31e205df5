pub mod core {
    pub mod batch;
    pub mod handle_race;
    pub mod noise;
    pub mod race;
    pub mod racer;
    pub mod scheduler;
}
pub mod interfaces {
    pub mod race_events;
}
pub mod post {
    pub mod race_result;
}
pub mod pre {
    pub mod read_sim_pars;
    pub mod sim_opts;
}
