// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, build the config, hand off to the UI.
// - Maps failures to exit codes: 2 when the server rejected a request,
//   1 for everything else.

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use gatrix::{cli::Cli, error, session::Config, ui};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::from(1) } else { ExitCode::SUCCESS };
        }
    };

    let config = Config::new(cli.debug);
    config.init_logging();

    if !cli.login && !cli.list_rooms && !cli.join && !cli.leave && !cli.send {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    match ui::run(&cli, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(error::exit_code(&e))
        }
    }
}
