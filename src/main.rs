use chrono::Utc;

use crate::clap_app::Cli;

mod app;
mod clap_app;
mod plot;

fn main() {
    let app = match Cli::build() {
        Ok(app) => app,
        Err(err) => {
            eprintln!("{} Cannot start the sweep: {:#}", Utc::now(), err);
            std::process::exit(1);
        }
    };

    println!(
        "{} Starting the sweep over {} combinations",
        Utc::now(),
        app.sweep.len()
    );
    std::process::exit(match app.run() {
        Ok(()) => {
            println!("{} End sweep", Utc::now());
            0
        }
        Err(err) => {
            eprintln!("{} {:#}", Utc::now(), err);
            1
        }
    });
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;

    Cli::command().debug_assert()
}
