use clap::Parser;
use tracing::{error, info};

use pushbench::config::Config;
use pushbench::server::Server;

#[tokio::main]
async fn main() {
    let config = Config::parse();
    pushbench::trace::init(&config.log_filter);

    let server = match Server::bind(&config) {
        Ok(server) => server,
        Err(err) => {
            error!("failed to start: {}", err);
            std::process::exit(1);
        }
    };
    info!(
        compress = config.compress,
        push_capacity = config.push_capacity,
        static_dir = %config.static_dir.display(),
        "starting"
    );

    tokio::select! {
        res = server.run() => {
            if let Err(err) = res {
                error!("server error: {}", err);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
        }
    }
}
