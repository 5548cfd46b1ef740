//! Portal - command-line front end
//!
//! Drives one tab of the portal from a terminal: the session comes from the
//! environment, sign-in redirects are logged instead of followed, and every
//! command prints a JSON `CommandResult`.

mod cli;
mod commands;
mod state;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command, UserCommand};
use commands::render;
use state::AppState;

pub async fn run() -> anyhow::Result<()> {
    // Initialize logging
    portal_core::init_logging();

    let cli = Cli::parse();
    let config = state::load_config(cli.config.as_deref()).context("loading configuration")?;
    let state = AppState::new(config).context("starting portal")?;

    let output = match cli.command {
        Command::Open { path } => render(commands::session::open(&state, &path).await),
        Command::Dashboard => render(commands::dashboard::show(&state).await),
        Command::Whoami => render(commands::session::whoami(&state)),
        Command::Login => render(commands::session::login(&state).await),
        Command::Logout { global } => render(commands::session::logout(&state, global).await),
        Command::Users { command } => match command {
            UserCommand::List => render(commands::users::list(&state).await),
            UserCommand::Register(form) => {
                render(commands::users::register(&state, form.into()).await)
            }
            UserCommand::Delete { id } => render(commands::users::delete(&state, id).await),
        },
        Command::Tab { peers } => render(commands::diagnostics::tabs(&state, peers).await),
    };

    println!("{output}");
    state.shutdown().await;
    Ok(())
}
