use log::{error, info};
use std::net::{SocketAddr, TcpListener};

use pixshelf::config::Config;
use pixshelf::routes::{build_routes, initialize_services};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Config::from_env()?;
    let addr = config.bind_address()?;

    info!("Starting Pixshelf server on {}", addr);
    info!("Images: {}", config.storage.images_path);
    info!("Thumbnails: {}", config.storage.thumbs_path);
    info!("Database: {}", config.db_path);

    // Check if port is available BEFORE initializing services
    if !is_port_available(addr) {
        error!(
            "Port {} is already in use. Please stop any existing Pixshelf instances or use a different port.",
            config.port
        );
        return Err(format!("Port {} is already in use", config.port).into());
    }

    let services = initialize_services(&config).await?;
    let routes = build_routes(services);

    info!("Server started successfully, listening on http://{}", addr);

    warp::serve(routes).run(addr).await;

    Ok(())
}

fn is_port_available(addr: SocketAddr) -> bool {
    TcpListener::bind(addr).is_ok()
}
