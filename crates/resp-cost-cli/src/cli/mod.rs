pub mod config;
pub mod redis;
pub mod sweep;
pub mod telemetry;

use resp_cost::{Error, PopulateReport, Result};

/// Feeds the outcome of one populate run into the metric handles.
pub fn record_run(result: &Result<PopulateReport>) {
    match result {
        Ok(report) => {
            telemetry::increment_keys_written(report.load.keys_written);
            telemetry::record_load_duration(report.load.elapsed.as_secs_f64() * 1_000.0);
            if let Some(reclaim) = &report.reclaim {
                telemetry::record_reclaim_polls(reclaim.polls as u64);
            }
        }
        Err(Error::LoadAborted { written, source, .. }) => {
            telemetry::increment_keys_written(*written);
            if matches!(**source, Error::Store { .. }) {
                telemetry::increment_write_errors();
            }
        }
        Err(_) => {}
    }
}
