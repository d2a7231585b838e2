//! JSON report adapter: serializes the full run result plus its parameters.

use crate::domain::engine::BacktestResult;
use crate::domain::error::DuotraderError;
use crate::domain::params::BacktestParams;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::fs;

pub struct JsonReportAdapter;

#[derive(Serialize)]
struct Report<'a> {
    params: &'a BacktestParams,
    result: &'a BacktestResult,
}

impl ReportPort for JsonReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        params: &BacktestParams,
        output_path: &str,
    ) -> Result<(), DuotraderError> {
        let report = Report { params, result };
        let json = serde_json::to_string_pretty(&report).map_err(|e| {
            DuotraderError::Report {
                reason: format!("serialization failed: {}", e),
            }
        })?;
        fs::write(output_path, json).map_err(|e| DuotraderError::Report {
            reason: format!("failed to write {}: {}", output_path, e),
        })?;
        Ok(())
    }
}
