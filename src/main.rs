use anscalc::commands::{Dispatcher, Reply};
use anscalc::error::CalcError;
use anscalc::format::{paint, plain, render_number, Palette};
use anscalc::{logging, store};
use clap::Parser;
use rustyline::{error::ReadlineError, Config, DefaultEditor};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "anscalc")]
#[command(about = "Console calculator with variables, undo, RPN and Fibonacci")]
struct Cli {
    /// Variable file used by :store and :restore
    #[arg(long, default_value = store::DEFAULT_FILE)]
    file: PathBuf,
    /// Significant digits shown in results
    #[arg(long, default_value_t = 12)]
    digits: usize,
    /// Restore variables from the variable file at startup
    #[arg(long)]
    autoload: bool,
    /// Log evaluation steps to stderr
    #[arg(long)]
    debug: bool,
    /// Print without colours
    #[arg(long)]
    no_color: bool,
}

fn history_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("anscalc").join("history.txt"))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let log = logging::init(cli.debug);
    if cli.no_color {
        colored::control::set_override(false);
    }
    let palette = Palette::default();

    let config = Config::builder().build();
    let mut rl = DefaultEditor::with_config(config)?;
    let history = history_path();
    if let Some(path) = &history {
        if rl.load_history(path).is_err() {
            debug!("No line history at {}", path.display());
        }
    }

    let mut dispatcher = Dispatcher::new(cli.file, cli.digits, log);
    if cli.autoload {
        match dispatcher.restore(None) {
            Ok(reply) => print_reply(&reply, dispatcher.digits(), &palette),
            Err(CalcError::FileNotFound(path)) => debug!("Nothing to restore at {}", path.display()),
            Err(err) => print_error(&err, &palette),
        }
    }

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    println!("Goodbye!");
                    break;
                }
                rl.add_history_entry(line.as_str())?;

                match dispatcher.dispatch(&line) {
                    Ok(reply) => print_reply(&reply, dispatcher.digits(), &palette),
                    Err(err) => print_error(&err, &palette),
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Pressing enter with no input will exit as well.");
                break;
            }
            Err(err) => {
                println!("{:?}", err);
                break;
            }
        }
    }

    if let Some(path) = &history {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Err(err) = rl.save_history(path) {
            warn!("Failed to save line history to {}: {}", path.display(), err);
        }
    }
    Ok(())
}

fn print_reply(reply: &Reply, digits: usize, palette: &Palette) {
    match reply {
        Reply::Value(value) => {
            let rendered = render_number(*value, digits, palette);
            debug!("Rendered {} as '{}'", value, plain(&rendered));
            for coloured_string in rendered {
                print!("{}", coloured_string);
            }
            println!();
        }
        Reply::Message(msg) => println!("{}", paint(msg, palette.message)),
    }
}

fn print_error(err: &CalcError, palette: &Palette) {
    println!("{}", paint(&err.to_string(), palette.error));
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults_and_flags() {
        let cli = Cli::parse_from(["anscalc"]);
        assert_eq!(cli.file.to_str(), Some("variables.txt"));
        assert_eq!(cli.digits, 12);
        assert!(!cli.autoload && !cli.debug && !cli.no_color);

        let cli = Cli::parse_from(["anscalc", "--file", "vars.txt", "--digits", "6", "--no-color"]);
        assert_eq!(cli.file.to_str(), Some("vars.txt"));
        assert_eq!(cli.digits, 6);
        assert!(cli.no_color);
    }
}
