use std::env;

use anyhow::Result;
use postcode_picker::{
    GeoNamesClient, PluginConfiguration, ResultCache, group_for_display, search,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "postcode_picker=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut args: Vec<String> = env::args().collect();
    let group = if let Some(pos) = args.iter().position(|a| a == "--group") {
        args.remove(pos);
        true
    } else {
        false
    };

    if args.len() < 2 {
        eprintln!("Usage: {} <query> [country] [username] [--group]", args[0]);
        eprintln!("  query: postcode or city prefix, at least 2 characters");
        eprintln!("  country: ISO 3166-1 alpha-2 code (default: $GEONAMES_COUNTRY or BE)");
        eprintln!("  username: GeoNames account (default: $GEONAMES_USERNAME or demo)");
        eprintln!("  --group: merge cities sharing a postcode");
        std::process::exit(1);
    }

    let mut config = PluginConfiguration::from_env();
    if let Some(country) = args.get(2) {
        config.country = Some(country.clone());
    }
    if let Some(username) = args.get(3) {
        config.geonames_username = Some(username.clone());
    }
    if group {
        config.group_cities_by_postcode = Some(true);
    }
    let config = config.normalized();

    let query = &args[1];
    let client = GeoNamesClient::new()?;
    let records = search(
        &client,
        ResultCache::global(),
        query,
        config.username(),
        &config.country(),
    )
    .await;

    if records.is_empty() {
        println!("No results found in {}", config.country());
        return Ok(());
    }

    for option in group_for_display(&records, config.group_cities_by_postcode()) {
        println!("{}", option.label);
    }

    Ok(())
}
