use clap::{value_parser, Arg, Command};

pub fn arg_parser_cli() -> Command {
    Command::new("bookdrop")
        .about("Search a file catalog and fetch books through a messaging bot")
        .subcommand_required(true)
        .subcommand(
            Command::new("serve").about("Run the books proxy").arg(
                Arg::new("listen")
                    .long("listen")
                    .value_name("ADDR")
                    .help("Address to listen on, overrides the configured one"),
            ),
        )
        .subcommand(
            Command::new("search")
                .about("Fetch one page of results through the proxy")
                .arg(Arg::new("query").num_args(0..).help("Text to look for"))
                .arg(
                    Arg::new("limit")
                        .long("limit")
                        .value_parser(value_parser!(u32)),
                )
                .arg(
                    Arg::new("offset")
                        .long("offset")
                        .value_parser(value_parser!(u32)),
                ),
        )
        .subcommand(Command::new("browse").about("Search and page through the catalog interactively"))
        .subcommand(
            Command::new("link")
                .about("Print the bot link for a book")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("config")
                .about("Inspect or change the stored configuration")
                .subcommand_required(true)
                .subcommand(Command::new("show").about("Print the effective configuration"))
                .subcommand(Command::new("defaults").about("Print the built-in defaults"))
                .subcommand(Command::new("check").about("Check that everything required is set"))
                .subcommand(Command::new("path").about("Print where the configuration is stored"))
                .subcommand(Command::new("clear").about("Remove the stored configuration"))
                .subcommand(
                    Command::new("set")
                        .about("Store values, e.g. `bot_username=filebot`")
                        .arg(Arg::new("pairs").num_args(1..).required(true)),
                ),
        )
}

/// Commands available inside `browse`, typed with a leading `:`.
pub fn arg_parser_repl() -> Command {
    let card = || {
        Arg::new("card")
            .required(true)
            .value_parser(value_parser!(usize))
    };
    Command::new("browse")
        .multicall(true)
        .subcommand_required(true)
        .subcommand(Command::new("more").about("Load the next page"))
        .subcommand(Command::new("retry").about("Repeat the request that failed"))
        .subcommand(Command::new("clear").about("Clear the search"))
        .subcommand(Command::new("open").about("Open a card's link").arg(card()))
        .subcommand(Command::new("copy").about("Copy a card's link").arg(card()))
        .subcommand(Command::new("quit").about("Leave"))
}

pub fn generate_completions() -> Vec<String> {
    let cmd = arg_parser_repl();
    let mut subcmds = cmd
        .get_subcommands()
        .map(|subcmd| format!(":{}", subcmd.get_name()))
        .collect::<Vec<_>>();
    subcmds.sort();
    subcmds
}
