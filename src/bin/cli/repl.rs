use std::path::PathBuf;

use anyhow::{bail, Result};
use bookdrop::browse::Command as BrowseCommand;
use reedline::{
    ColumnarMenu, DefaultCompleter, Emacs, ExampleHighlighter, FileBackedHistory, KeyCode,
    KeyModifiers, Reedline, ReedlineEvent, ReedlineMenu, Signal,
};

use crate::{command_parser, prompt::BookdropPrompt};

const HISTORY_SIZE: usize = 1000;

pub struct Repl {
    reedline: Reedline,
    prompt:   BookdropPrompt,
}

impl Repl {
    pub fn new(commands: Vec<String>, history_file: PathBuf) -> Result<Self> {
        if let Some(parent) = history_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let history = Box::new(FileBackedHistory::with_file(HISTORY_SIZE, history_file)?);

        let completer = Box::new(DefaultCompleter::new_with_wordlen(commands.clone(), 1));

        let completion_menu = Box::new(ColumnarMenu::default().with_name("completion_menu"));

        let mut keybindings = reedline::default_emacs_keybindings();
        keybindings.add_binding(
            KeyModifiers::NONE,
            KeyCode::Tab,
            ReedlineEvent::UntilFound(vec![
                ReedlineEvent::Menu("completion_menu".to_string()),
                ReedlineEvent::MenuNext,
            ]),
        );

        let edit_mode = Box::new(Emacs::new(keybindings));

        let line_editor = Reedline::create()
            .with_history(history)
            .with_highlighter(Box::new(ExampleHighlighter::new(commands)))
            .with_completer(completer)
            .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
            .with_edit_mode(edit_mode);

        Ok(Repl {
            reedline: line_editor,
            prompt:   BookdropPrompt {},
        })
    }

    pub fn read_line(&mut self) -> Result<Signal> {
        Ok(self.reedline.read_line(&self.prompt)?)
    }
}

/// What a line typed into `browse` asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    Command(BrowseCommand),
    Quit,
}

/// Plain text is a search, an empty line scrolls to the end of the list, anything starting
/// with `:` is a command. Card numbers are one-based.
pub fn parse_line(line: &str) -> Result<Line> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(Line::Command(BrowseCommand::SentinelVisible));
    }
    let command = match trimmed.strip_prefix(':') {
        Some(command) => command,
        None => return Ok(Line::Command(BrowseCommand::Input(trimmed.to_string()))),
    };
    let words = match shlex::split(command) {
        Some(words) => words,
        None => bail!("Invalid command"),
    };
    let matches = command_parser::arg_parser_repl().try_get_matches_from(words)?;
    let card = |m: &clap::ArgMatches| -> Result<usize> {
        match m.get_one::<usize>("card") {
            Some(&n) if n > 0 => Ok(n - 1),
            _ => bail!("Cards are numbered from 1"),
        }
    };
    Ok(match matches.subcommand() {
        Some(("more", _)) => Line::Command(BrowseCommand::SentinelVisible),
        Some(("retry", _)) => Line::Command(BrowseCommand::Retry),
        Some(("clear", _)) => Line::Command(BrowseCommand::Clear),
        Some(("open", m)) => Line::Command(BrowseCommand::Open(card(m)?)),
        Some(("copy", m)) => Line::Command(BrowseCommand::Copy(card(m)?)),
        Some(("quit", _)) => Line::Quit,
        Some((name, _)) => unimplemented!("{}", name),
        None => unreachable!("subcommand required"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines() {
        assert_eq!(
            parse_line("  dune messiah ").unwrap(),
            Line::Command(BrowseCommand::Input("dune messiah".into()))
        );
        assert_eq!(parse_line("").unwrap(), Line::Command(BrowseCommand::SentinelVisible));
        assert_eq!(parse_line(":more").unwrap(), Line::Command(BrowseCommand::SentinelVisible));
        assert_eq!(parse_line(":open 3").unwrap(), Line::Command(BrowseCommand::Open(2)));
        assert_eq!(parse_line(":copy 1").unwrap(), Line::Command(BrowseCommand::Copy(0)));
        assert_eq!(parse_line(":quit").unwrap(), Line::Quit);
        assert!(parse_line(":open 0").is_err());
        assert!(parse_line(":open").is_err());
        assert!(parse_line(":dance").is_err());
    }
}
