use std::sync::Arc;

use chatwave::{api, Config, RoomRelay};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    // One relay per process: created here, torn down with the process, and
    // injected into the filters rather than reached as ambient state.
    let relay = Arc::new(RoomRelay::new());
    let routes = api::build_filters(relay, config.ping_interval);

    log::info!("listening on {}", config.addr);
    warp::serve(routes).run(config.addr).await;
}
