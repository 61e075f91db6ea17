use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

mod api;
mod cli;
mod controller;
mod domain;
mod fetcher;
mod input;
mod model;
mod ui;

use api::HttpProductSource;
use cli::CliArgs;
use controller::Controller;
use domain::{LtvError, Message};
use fetcher::Fetcher;
use model::{Model, Status};
use ui::TableUI;

fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn run(args: CliArgs) -> Result<(), LtvError> {
    cli::init_tracing(args.log_file.as_deref())?;
    let config = args.into_config()?;
    info!("Starting ltv against {}", config.base_url);

    let source = Arc::new(HttpProductSource::new(config.base_url.clone()));
    let mut fetcher = Fetcher::new(source)?;

    let mut terminal = ratatui::init();
    let size = terminal.size()?;
    let mut model = Model::init(&config, size.width as usize, size.height as usize)?;
    let mut ui = TableUI::new(&config);
    let controller = Controller::new(&config);

    // Initial load, same window the table would ask for on first render.
    model.request_window(0, config.page_size);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(message)?;
        }

        // Feed completed fetches back into the model
        while let Some(outcome) = fetcher.try_recv() {
            model.update(Message::WindowLoaded(outcome))?;
        }

        // Stage a fetch if the viewport shows unloaded slots, then dispatch
        model.scan_viewport();
        if let Some(window) = model.take_staged() {
            fetcher.dispatch(window);
        }
    }

    Ok(())
}
