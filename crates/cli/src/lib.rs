use anyhow::{Context, Result};
use clap::Parser;
use dialog_gateway::ReplyGateway;
use dialog_navigation::SessionKey;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

mod board;
mod config;
mod console;
mod screens;

pub use board::{Answer, Roles, Task, TaskBoard};
pub use config::{AppConfig, SessionConfig, MESSAGE_LIMIT_ENV};
pub use console::{button_labels, layout_buttons, ConsoleTransport};
pub use screens::{Dispatcher, Mode};

#[derive(Parser)]
#[command(name = "dialog")]
#[command(about = "Drive a multi-step chat dialog from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Chat the events belong to
    #[arg(long, default_value_t = 1)]
    chat_id: i64,

    /// User sending the events (prefix a line with `@<id>` to switch)
    #[arg(long, default_value_t = 1)]
    user_id: i64,

    /// Treat the default user as an admin
    #[arg(long)]
    admin: bool,

    /// Print outgoing messages as JSON lines
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long)]
    quiet: bool,
}

/// Split an optional `@<user_id>` prefix off an input line.
pub fn parse_event(line: &str, default: SessionKey) -> (SessionKey, &str) {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix('@') {
        let (id, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if let Ok(user_id) = id.parse() {
            return (SessionKey::new(default.chat_id, user_id), text);
        }
    }
    (default, line)
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if cli.admin {
        config.admins.push(cli.user_id);
    }
    log::debug!(
        "Message limit {} chars, confirm window {} s",
        config.gateway.message_limit,
        config.gateway.confirm_window_secs
    );

    let store = Arc::new(config.session.build_store());
    let transport = Arc::new(ConsoleTransport::stdout(
        config.gateway.lexicon.clone(),
        cli.json,
    ));
    let gateway = ReplyGateway::new(store, transport, config.gateway.clone())
        .context("Failed to build reply gateway")?;
    let dispatcher = Dispatcher::new(gateway, Roles::new(config.admins.iter().copied()));

    let default_key = SessionKey::new(cli.chat_id, cli.user_id);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handled = 0usize;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        let (key, input) = parse_event(&line, default_key);
        if let Err(err) = dispatcher.handle(key, input).await {
            log::error!("{err:#}");
        }
        handled += 1;
    }
    log::info!("Input closed after {handled} events");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_prefix_switches_session() {
        let default = SessionKey::new(5, 1);
        assert_eq!(parse_event("/start", default), (default, "/start"));
        assert_eq!(
            parse_event("@42 /reviewer", default),
            (SessionKey::new(5, 42), "/reviewer")
        );
        assert_eq!(parse_event("@42", default), (SessionKey::new(5, 42), ""));
        assert_eq!(
            parse_event("@someone hi", default),
            (default, "@someone hi")
        );
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from(["dialog", "--user-id", "9", "--admin", "-v"]).unwrap();
        assert_eq!(cli.user_id, 9);
        assert_eq!(cli.chat_id, 1);
        assert!(cli.admin && cli.verbose && !cli.quiet);
    }
}
