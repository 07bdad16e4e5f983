mod cli;

use std::sync::Arc;

use clap::Parser;

use cli::Commands;
use placesuggest::{
    config,
    handlers::{Consts, Ctx},
    http, init, session,
};

#[cfg(target_env = "musl")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    init::init_logger();

    let cli = cli::Cli::parse();

    // Generate a new config file.
    if let Some(Commands::NewConfig { path }) = &cli.command {
        match config::generate_sample(path) {
            Ok(_) => {
                log::info!("config file generated: {}", path.display());
            }
            Err(e) => {
                log::error!("error generating config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    // Load config.
    let config = config::load_all(&cli.config);

    let cache = match init::init_cache(&config.cache.clone().unwrap_or_default()) {
        Ok(c) => c,
        Err(e) => {
            log::error!("error initializing cache: {}", e);
            std::process::exit(1);
        }
    };

    let remote = match init::init_remote(&config.remote.clone().unwrap_or_default(), cache) {
        Ok(r) => r,
        Err(e) => {
            log::error!("error initializing remote source: {}", e);
            std::process::exit(1);
        }
    };

    let fields = init::init_fields(&config);

    let ctx = Arc::new(Ctx {
        fields,
        remote,
        consts: Consts {
            admin_username: config.app.admin_username,
            admin_password: config.app.admin_password,
            check_referrer: config.app.check_referrer,
        },
    });

    // Interactive session on stdin.
    if let Some(Commands::Suggest { field }) = &cli.command {
        let f = match ctx.fields.get(field) {
            Ok(f) => f,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        };

        if let Err(e) = session::run(ctx.sources(f)).await {
            log::error!("error reading input: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // Start the HTTP server.
    let routes = http::init_handlers(ctx);
    let addr = if config.app.address.is_empty() {
        "0.0.0.0:9000".to_string()
    } else {
        config.app.address
    };

    log::info!("starting server on {}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            log::error!("error listening on {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, routes).await {
        log::error!("server error: {}", e);
        std::process::exit(1);
    }
}
