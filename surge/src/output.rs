use crate::cli::OutputFormat;
use std::path::Path;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(
        &self,
        scenario_path: &Path,
        config: &surge_core::ScenarioConfig,
        scenario: &surge_core::RequestScenario,
    );
    fn progress(&self) -> Option<surge_core::ProgressFn>;
    fn print_summary(&self, result: &surge_core::RunResult) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
