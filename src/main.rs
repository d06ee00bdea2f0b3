use anyhow::Context;
use cityclock::{
    app::{App, Event},
    config::Config,
    time_api::HttpTimeApi,
};
use log::LevelFilter;
use std::{io, sync::Arc};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module("cityclock", LevelFilter::Info)
        .parse_default_env()
        .init();

    let config = Config::load()?;
    let api = Arc::new(HttpTimeApi::new(
        &config.api_host,
        config.request_timeout(),
    ));
    let mut app = App::new(&config, api, io::stdout())?;

    let sender = app.sender();
    ctrlc::set_handler(move || {
        let _ = sender.send(Event::Quit);
    })
    .context("Error setting Ctrl-C handler")?;
    app.spawn_input(io::BufReader::new(io::stdin()));

    println!("Type a city or item number to select it, `quit` to exit");
    app.run()
}
