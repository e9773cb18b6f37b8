// src/commands.rs
use chrono::{DateTime, Local, TimeZone};
use std::fmt;

use crate::client::RequestClient;
use crate::config::{Command, Context};
use crate::errors::Result;
use crate::payload::Payload;
use crate::reporter::Reporter;
use crate::session::SessionLauncher;

pub const TIME_OUTPUT: &str = "time";

/// Runs the context's command and publishes the completion time.
///
/// This is the command boundary: whatever it returns as `Err` fails the step.
pub async fn execute<R: Reporter>(
    ctx: &Context,
    client: &RequestClient,
    reporter: &R,
) -> Result<Option<Payload>> {
    let result = match ctx.command {
        Command::Run => SessionLauncher::new(client, reporter).run_eval_session(ctx).await,
    };

    match &result {
        Some(payload) => reporter.debug(&payload.to_string()),
        None => reporter.debug("nothing returned"),
    }

    reporter.set_output(TIME_OUTPUT, &time_of_day(&Local::now()));
    Ok(result)
}

/// `HH:MM:SS GMT+hhmm (zone)`, the shape of a browser's `toTimeString`.
/// chrono has no zone names for local time, so the suffix holds the offset
/// there and `UTC` for UTC times.
pub fn time_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    now.format("%H:%M:%S GMT%z (%Z)").to_string()
}

/// Loads the context from the environment and executes it.
pub async fn run_from_env<R: Reporter>(reporter: &R) -> Result<Option<Payload>> {
    let ctx = Context::from_env()?;
    let client = RequestClient::new()?;
    execute(&ctx, &client, reporter).await
}
