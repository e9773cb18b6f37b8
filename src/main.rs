use session_runner::commands;
use session_runner::reporter::{ActionsReporter, Reporter};

#[tokio::main]
async fn main() {
    // A .env file is optional; inputs normally come from the workflow.
    let dotenv = dotenvy::dotenv();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    if let Err(e) = dotenv {
        log::debug!("No .env file loaded: {}", e);
    }

    let reporter = ActionsReporter::from_env();
    if let Err(e) = commands::run_from_env(&reporter).await {
        reporter.set_failed(&e.to_string());
    }

    if reporter.has_failed() {
        std::process::exit(1);
    }
}
