use std::error::Error;

use api::core::app_state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine: variables may come from the process environment.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("no .env loaded: {e}");
    }

    ai_llm_service::telemetry::init("info,pr_reviewer=debug,api=debug");

    let scheduler = pr_reviewer::scheduler_from_env()?;

    // Handles are dropped; resumed instances keep running in the background.
    scheduler.resume_pending().await?;

    let state = AppState::from_env(scheduler);
    info!("starting api");
    api::start(state).await?;

    Ok(())
}
