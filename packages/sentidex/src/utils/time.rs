use std::time::Instant;

use log::info;

/// Logs the time since `instant`, if performance logging is switched on.
pub fn print_time_elapsed(instant: &Option<Instant>, stage: &str) {
    if let Some(instant) = instant {
        let elapsed = instant.elapsed().as_secs_f64();
        info!("({}) {} mins {:.3} seconds elapsed.", stage, (elapsed as u32) / 60, elapsed % 60.0);
    }
}

pub fn start_timer(log_perf: bool) -> Option<Instant> {
    if log_perf {
        Some(Instant::now())
    } else {
        None
    }
}
