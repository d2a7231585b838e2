//! Report generation port trait.

use crate::domain::engine::BacktestResult;
use crate::domain::error::DuotraderError;
use crate::domain::params::BacktestParams;

/// Port for writing run results.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        params: &BacktestParams,
        output_path: &str,
    ) -> Result<(), DuotraderError>;
}
