use std::sync::Arc;

use crate::{
    cache::{parse_duration, Cache, CacheConfig},
    fields::Fields,
    models::{Config, RemoteConfig},
    sources::{
        remote::{GooglePlaces, RemoteSource},
        Source,
    },
};

/// Environment variable holding the remote API key if the config has none.
const ENV_API_KEY: &str = "GMAPS_PLACE_AUTOCOMPLETE_KEY";

/// Initialize logger.
pub fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .format(|buf, record| {
            use std::io::Write;
            let level = if record.level() != log::Level::Info {
                format!("[{}] ", record.level())
            } else {
                String::new()
            };
            writeln!(
                buf,
                "{} {}:{} {}{}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                level,
                record.args()
            )
        })
        .init();
}

/// Initialize input fields from config. Indexes are built on first use.
pub fn init_fields(config: &Config) -> Fields {
    let fields = Fields::new(&config.field);

    for f in fields.iter() {
        log::info!("field: {}", f.name);
    }
    if fields.is_empty() {
        log::warn!("no fields configured");
    }

    fields
}

/// Initialize the remote response cache, if enabled.
pub fn init_cache(cfg: &CacheConfig) -> Result<Option<Arc<Cache>>, Box<dyn std::error::Error>> {
    if !cfg.enabled {
        return Ok(None);
    }

    let cache = Cache::new(cfg)?;
    log::info!(
        "remote cache enabled (max {} entries, ttl {})",
        cfg.max_entries,
        cfg.ttl
    );
    Ok(Some(Arc::new(cache)))
}

/// Initialize the remote place source, if enabled.
pub fn init_remote(
    cfg: &RemoteConfig,
    cache: Option<Arc<Cache>>,
) -> Result<Option<Arc<dyn Source>>, Box<dyn std::error::Error>> {
    if !cfg.enabled {
        log::info!("remote suggestions disabled");
        return Ok(None);
    }

    let api_key = if cfg.api_key.is_empty() {
        std::env::var(ENV_API_KEY).unwrap_or_default()
    } else {
        cfg.api_key.clone()
    };
    if api_key.is_empty() {
        log::warn!("no remote API key in config or ${}", ENV_API_KEY);
    }

    let timeout = parse_duration(&cfg.timeout)?;
    let client = GooglePlaces::new(&cfg.url, &api_key, timeout)?;

    log::info!("remote suggestions: {} ({})", cfg.heading, cfg.url);
    Ok(Some(Arc::new(RemoteSource::new(
        Arc::new(client),
        &cfg.heading,
        &cfg.bias_location,
        cfg.bias_radius,
        cache,
    ))))
}
