use std::sync::Arc;

use anyhow::{bail, Result};
use clap::ArgMatches;
use dotenvy::dotenv;
use reedline::Signal;
use tracing_subscriber::EnvFilter;

mod command_parser;
mod prompt;
mod repl;
mod server;
mod terminal;

use bookdrop::{
    browse::{desktop::SystemDesktop, Command, Controller, ControllerOptions, ProxyClient},
    config::{self, Config, ConfigLayer},
    link::DeepLinker,
    types::book::BookId,
};
use repl::Line;
use terminal::TerminalView;

const SERVER_LOG_FILTER: &str = "bookdrop=info,tower_http=info";
const CLIENT_LOG_FILTER: &str = "bookdrop=warn";

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn require_bot(config: &Config) -> Result<()> {
    if config.bot_username.trim().is_empty() {
        bail!("No bot username configured, set TELEGRAM_BOT_USERNAME or run `bookdrop config set bot_username=NAME`");
    }
    Ok(())
}

async fn search(config: &Config, matches: &ArgMatches) -> Result<()> {
    let query = matches
        .get_many::<String>("query")
        .map(|words| words.cloned().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();
    let limit = matches.get_one::<u32>("limit").copied().unwrap_or(config.page_size);
    let offset = matches.get_one::<u32>("offset").copied().unwrap_or(0);

    let client = ProxyClient::new(&config.proxy_url)?;
    let page = client.page(&query, limit, offset).await?;

    let mut view = TerminalView::new(config);
    if page.data.is_empty() {
        println!("{}", terminal::NO_RESULTS);
        return Ok(());
    }
    view.skip(offset as usize);
    view.print_books(&page.data);
    match page.total {
        Some(total) => println!("{} of {total} results", page.data.len()),
        None => println!("{} results", page.data.len()),
    }
    Ok(())
}

async fn browse(config: &Config) -> Result<()> {
    require_bot(config)?;
    let api = Arc::new(ProxyClient::new(&config.proxy_url)?);
    let mut handle = Controller::spawn(
        ControllerOptions::from_config(config),
        api,
        Arc::new(SystemDesktop),
        TerminalView::new(config),
    );

    handle.send(Command::Search(String::new()))?;
    handle.settled().await?;

    let history = Config::storage_path().with_file_name("history.txt");
    let mut repl = repl::Repl::new(command_parser::generate_completions(), history)?;
    loop {
        match repl.read_line()? {
            Signal::Success(buffer) => match repl::parse_line(&buffer) {
                Ok(Line::Command(command)) => {
                    handle.send(command)?;
                    handle.settled().await?;
                }
                Ok(Line::Quit) => break,
                Err(e) => println!("Error: {}", e),
            },
            Signal::CtrlD | Signal::CtrlC => {
                println!("\nAborted!");
                break;
            }
        }
    }
    handle.shutdown().await;
    Ok(())
}

/// Runs without reading the layered configuration up front, so a broken storage file can
/// still be inspected, overwritten or removed.
fn handle_config(matches: &ArgMatches) -> Result<()> {
    let path = Config::storage_path();
    match matches.subcommand() {
        Some(("show", _)) => print!("{}", Config::read_config()?.as_string()?),
        Some(("defaults", _)) => print!("{}", Config::default_as_string()?),
        Some(("check", _)) => {
            Config::read_config()?.validate()?;
            println!("Configuration is complete.");
        }
        Some(("path", _)) => println!("{}", path.display()),
        Some(("clear", _)) => {
            if config::clear(&path)? {
                println!("Removed {}.", path.display());
            } else {
                println!("Nothing stored at {}.", path.display());
            }
        }
        Some(("set", m)) => {
            let pairs = m
                .get_many::<String>("pairs")
                .map(|pairs| pairs.cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            config::save(&path, &ConfigLayer::from_pairs(&pairs)?)?;
            println!("Saved to {}.", path.display());
        }
        Some((name, _)) => unimplemented!("{}", name),
        None => unreachable!("subcommand required"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = command_parser::arg_parser_cli().get_matches();
    // A missing .env file is fine.
    let _ = dotenv();

    let serving = matches!(matches.subcommand(), Some(("serve", _)));
    init_tracing(if serving { SERVER_LOG_FILTER } else { CLIENT_LOG_FILTER });

    if let Some(("config", m)) = matches.subcommand() {
        return handle_config(m);
    }
    let config = Config::read_config()?;

    match matches.subcommand() {
        Some(("serve", m)) => {
            server::start(&config, m.get_one::<String>("listen").map(String::as_str)).await?
        }
        Some(("search", m)) => search(&config, m).await?,
        Some(("browse", _)) => browse(&config).await?,
        Some(("link", m)) => {
            require_bot(&config)?;
            let id = m.get_one::<String>("id").cloned().unwrap_or_default();
            println!("{}", DeepLinker::from_config(&config).link(&BookId(id))?);
        }
        Some((name, _)) => unimplemented!("{}", name),
        None => unreachable!("subcommand required"),
    }

    Ok(())
}
