use anyhow::Context as _;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;
use crate::run_support::merged_env;
use crate::scenario_yaml::load_scenario;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let env = merged_env(&args.env).map_err(RunError::InvalidInput)?;
    let loaded = load_scenario(&args.scenario, &env)
        .await
        .map_err(RunError::InvalidInput)?;

    let config = surge_core::scenario_from_options(loaded.options, run_config(&args))
        .with_context(|| format!("invalid scenario config: {}", args.scenario.display()))
        .map_err(RunError::InvalidInput)?;

    let mut controller = surge_core::RunController::new(config);
    out.print_header(args.scenario.as_path(), controller.config(), &loaded.scenario);

    if let Some(progress) = out.progress() {
        controller = controller.with_progress(args.progress_interval, progress);
    }

    let interrupt = spawn_interrupt_handler(controller.cancel_token());
    let result = controller.run(loaded.scenario).await;
    interrupt.abort();

    out.print_summary(&result).map_err(RunError::RuntimeError)?;

    let code = ExitCode::from_run(&result);
    if result.aborted() {
        eprintln!("run aborted: {}", args.scenario.display());
    }

    Ok(code)
}

fn run_config(args: &RunArgs) -> surge_core::RunConfig {
    surge_core::RunConfig {
        vus: args.vus,
        duration: args.duration,
        pause: args.pause,
        grace_period: args.grace_period,
        name: args.name.clone(),
        params: args.params.clone(),
    }
}

fn spawn_interrupt_handler(
    cancel: surge_core::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping virtual users");
            cancel.cancel();
        }
    })
}
