use std::path::Path;

use anyhow::Result;

use crate::{
    cli::{Cli, Command},
    domain, infra, transport,
    usecases::{
        self, bootstrap,
        context::AppContext,
        replay::{self, ReplaySummary},
    },
};

const REPLAY_COMPLETED: &str = "REPLAY_COMPLETED";

pub fn run(cli: Cli) -> Result<()> {
    let context = bootstrap::bootstrap(cli.config.as_deref())?;

    tracing::debug!(
        domain = domain::module_name(),
        transport = transport::module_name(),
        usecases = usecases::module_name(),
        infra = infra::module_name(),
        "module boundaries loaded"
    );

    match cli.command_or_default() {
        Command::Replay { script, user } => {
            let summary = replay_script(&context, &script, user)?;
            println!("{summary}");
        }
    }

    Ok(())
}

/// Runs the engines on a single-threaded runtime, matching the event-loop
/// model they are written for.
fn replay_script(context: &AppContext, script: &Path, user: Option<String>) -> Result<ReplaySummary> {
    let steps = replay::load_script(script)?;
    let user_id = user.or_else(|| context.config.chat.user_id.clone());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(replay::run_replay(context, user_id, &steps));

    tracing::info!(
        code = REPLAY_COMPLETED,
        steps = summary.steps,
        script = %script.display(),
        "replay completed"
    );

    Ok(summary)
}
