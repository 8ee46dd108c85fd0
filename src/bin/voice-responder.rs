use clap::Parser;
use voice_responder::api::Server;
use voice_responder::config::{load_dotenv, Config};

#[tokio::main]
async fn main() {
    let dotenv = load_dotenv();
    voice_responder::init_logging();
    if let Some(path) = dotenv {
        log::debug!("Loaded environment from {}", path.display());
    }

    let config = Config::parse();

    let responder = match config.into_responder() {
        Ok(responder) => responder,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = Server::new(responder).run(&config.bind).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
