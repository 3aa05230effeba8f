use std::{
    io::{self, BufRead},
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use config::Config;
use futures::future::join_all;
use log::{debug, error, info, warn};
use pipeline::{Expander, Outcome};
use telegram::{TelegramClient, Update};
use tokio::time;

use crate::{chat::ConsoleChat, http::ReqwestClient};

mod chat;
mod config;
mod http;
mod pipeline;
mod render;
mod telegram;
mod twitter;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Path to configuration file.
    #[arg(long, default_value = ".twexpand.yml")]
    config: PathBuf,

    /// Expand links from stdin lines and print the result instead of running the bot.
    #[arg(long)]
    stdin: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let Args { config, stdin } = Args::parse();

    let cfg = match Config::load(&config) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let http = match ReqwestClient::new(Duration::from_secs(cfg.http_timeout)) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("Failed to build HTTP client: {e}");
            return ExitCode::FAILURE;
        }
    };
    let expander = Expander::new(&cfg, Arc::new(http));

    if stdin {
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(v) => v,
                Err(e) => {
                    error!("Failed to read stdin: {e}");
                    return ExitCode::FAILURE;
                }
            };
            report(&expander.handle(&line, &ConsoleChat).await);
        }

        return ExitCode::SUCCESS;
    }

    let Some(token) = cfg.telegram_token.clone() else {
        eprintln!("`telegram_token` must be set to run the bot (or pass --stdin)");
        return ExitCode::FAILURE;
    };
    let telegram = TelegramClient::new(token, cfg.telegram_api.clone());
    let timeout = Duration::from_secs(cfg.poll_timeout);

    let expander = &expander;
    info!("Polling telegram for messages");
    let mut offset = 0;
    loop {
        let updates = match telegram.get_updates(offset, timeout).await {
            Ok(v) => v,
            Err(e) => {
                warn!("Failed to fetch updates: {e}");
                time::sleep(Duration::from_secs(5)).await;
                continue;
            }
        };

        if let Some(last) = updates.last() {
            offset = last.update_id + 1;
        }

        let jobs = updates.iter().filter_map(|Update { message, .. }| {
            let message = message.as_ref()?;
            let text = message.text.as_deref()?;
            let chat = telegram.chat(message.chat.id);

            Some(async move { report(&expander.handle(text, &chat).await) })
        });

        join_all(jobs).await;
    }
}

fn report(outcome: &Outcome) {
    // the expander is the only handler, so a consumed message ends here
    if !outcome.falls_through() {
        debug!("Message consumed, not passed on");
    }

    match outcome {
        Outcome::Passed => {}
        Outcome::Rejected => info!("Skipped sensitive tweet"),
        Outcome::Expanded { sent, failed_media } => {
            info!("Expanded tweet into {sent} items");
            for e in failed_media {
                warn!("{e}");
            }
        }
        Outcome::Failed {
            stage,
            error,
            notice_error,
        } => {
            error!("Failed while {stage:?}: {error}");
            if let Some(e) = notice_error {
                error!("Failed to tell the chat about it: {e}");
            }
        }
    }
}
