use crate::core::race::Race;
use crate::core::scheduler::{CancelHandle, FrameOutcome, Scheduler};
use crate::interfaces::race_events::RaceObserver;
use crate::post::race_result::RaceResult;
use crate::pre::read_sim_pars::SimPars;
use anyhow::Context;
use helpers::general::InputValueError;
use std::thread::sleep;
use std::time::{Duration, Instant};

pub const DEFAULT_FRAME_RATE: f64 = 60.0;

/// FrameHost determines who provides the frame callbacks.
/// * `Headless` - frames are issued back to back with synthetic timestamps n * frame_interval,
///   the result is fully deterministic
/// * `Realtime` - frames are paced by the wall clock, realtime_factor > 1.0 speeds the race up
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameHost {
    Headless,
    Realtime { realtime_factor: f64 },
}

/// frame_interval_from_rate converts a host frame rate (Hz) into the interval between two frames.
pub fn frame_interval_from_rate(frame_rate: f64) -> anyhow::Result<Duration> {
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return Err(InputValueError).context(format!(
            "Frame rate must be finite and positive, but is {}!",
            frame_rate
        ));
    }
    Duration::try_from_secs_f64(1.0 / frame_rate)
        .map_err(|_| InputValueError)
        .context(format!(
            "Frame rate {} results in a frame interval that is out of range!",
            frame_rate
        ))
}

/// handle_race creates a race on the basis of the inserted parameters, drives it by the given
/// frame host until it is completed or cancelled, and returns the results for post-processing
/// (None if cancelled).
pub fn handle_race<O: RaceObserver>(
    sim_pars: &SimPars,
    frame_interval: Duration,
    frame_host: FrameHost,
    observer: O,
    cancel_handle: &CancelHandle,
) -> anyhow::Result<Option<RaceResult>> {
    if frame_interval.is_zero() {
        return Err(InputValueError).context("Frame interval must be positive!");
    }

    let race = Race::new(&sim_pars.race_pars, &sim_pars.racer_pars_all)
        .context("Failed to create race!")?;
    let mut scheduler = Scheduler::with_cancel_handle(race, observer, cancel_handle.to_owned());

    let outcome = match frame_host {
        FrameHost::Headless => run_headless(&mut scheduler, frame_interval)?,
        FrameHost::Realtime { realtime_factor } => {
            run_realtime(&mut scheduler, frame_interval, realtime_factor)?
        }
    };

    if outcome == FrameOutcome::Cancelled {
        return Ok(None);
    }

    let completion_event = scheduler
        .get_race()
        .get_completion_event()
        .context("Race stopped without completion event!")?;

    Ok(Some(RaceResult::new(
        &completion_event,
        &sim_pars.racer_pars_all,
        sim_pars.race_pars.race_distance,
    )))
}

fn run_headless<O: RaceObserver>(
    scheduler: &mut Scheduler<O>,
    frame_interval: Duration,
) -> anyhow::Result<FrameOutcome> {
    let mut frame_no: u32 = 0;

    loop {
        let timestamp = frame_interval
            .checked_mul(frame_no)
            .context("Exceeded maximum race duration!")?;
        let outcome = scheduler.on_frame(timestamp)?;
        if outcome != FrameOutcome::Reschedule {
            return Ok(outcome);
        }
        frame_no = frame_no
            .checked_add(1)
            .context("Exceeded maximum number of frames!")?;
    }
}

fn run_realtime<O: RaceObserver>(
    scheduler: &mut Scheduler<O>,
    frame_interval: Duration,
    realtime_factor: f64,
) -> anyhow::Result<FrameOutcome> {
    if !(realtime_factor.is_finite() && realtime_factor > 0.0) {
        return Err(InputValueError).context(format!(
            "Real-time factor must be finite and positive, but is {}!",
            realtime_factor
        ));
    }

    let frame_interval_real = frame_interval.div_f64(realtime_factor);
    let t_origin = Instant::now();
    let mut t_next_frame = t_origin;

    loop {
        // the race sees the wall time scaled by the real-time factor
        let outcome = scheduler.on_frame(t_origin.elapsed().mul_f64(realtime_factor))?;
        if outcome != FrameOutcome::Reschedule {
            return Ok(outcome);
        }

        // sleep until the next frame is due
        t_next_frame += frame_interval_real;
        let t_now = Instant::now();

        if t_next_frame > t_now {
            sleep(t_next_frame - t_now);
        } else {
            log::warn!("Could not keep up with real-time!");
            t_next_frame = t_now;
        }
    }
}
