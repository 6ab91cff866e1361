/// Example HTTP client for the postcode picker server
///
/// Run the server first:
/// ```bash
/// cargo run --bin server
/// ```
///
/// Then run this example:
/// ```bash
/// cargo run --example api_client
/// ```

use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize, Debug)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Deserialize, Debug, Clone)]
struct PostalRecord {
    postcode: String,
    city: String,
}

#[derive(Deserialize, Debug, Clone)]
struct DisplayOption {
    label: String,
    value: PostalRecord,
}

#[derive(Deserialize, Debug)]
struct OptionsResponse {
    data: Vec<DisplayOption>,
}

#[derive(Deserialize, Debug)]
struct EncodeResponse {
    value: String,
}

#[derive(Deserialize, Debug)]
struct MetricsResponse {
    total_requests: u64,
    cache_misses: u64,
    cached_queries: usize,
    uptime_seconds: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let query = std::env::args().nth(1).unwrap_or_else(|| "Leu".to_string());
    let client = reqwest::Client::new();

    println!("=== Postcode Picker HTTP API Client Demo ===\n");

    println!("1. Checking server health...");
    let health: HealthResponse = client
        .get(format!("{}/health", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Server status: {}", health.status);
    println!("   Version: {}\n", health.version);

    println!("2. Searching {:?}...", query);
    let options: OptionsResponse = client
        .get(format!("{}/api/postcodes", base_url))
        .query(&[("q", query.as_str())])
        .send()
        .await?
        .json()
        .await?;
    for (i, option) in options.data.iter().enumerate() {
        println!("   [{}] {}", i + 1, option.label);
    }
    println!();

    println!("3. Encoding the first two options as a field value...");
    let chosen: Vec<_> = options
        .data
        .iter()
        .take(2)
        .map(|o| json!({ "postcode": o.value.postcode, "city": o.value.city }))
        .collect();
    let encoded: EncodeResponse = client
        .post(format!("{}/api/field/encode", base_url))
        .json(&chosen)
        .send()
        .await?
        .json()
        .await?;
    println!("   Stored value: {}\n", encoded.value);

    println!("4. Restoring the selection from the stored value...");
    let restored: OptionsResponse = client
        .post(format!("{}/api/field/decode", base_url))
        .json(&encoded.value)
        .send()
        .await?
        .json()
        .await?;
    for option in &restored.data {
        println!("   {}", option.label);
    }
    println!();

    println!("5. Getting server metrics...");
    let metrics: MetricsResponse = client
        .get(format!("{}/api/metrics", base_url))
        .send()
        .await?
        .json()
        .await?;
    println!("   Total requests: {}", metrics.total_requests);
    println!("   Cache misses: {}", metrics.cache_misses);
    println!("   Cached queries: {}", metrics.cached_queries);
    println!("   Uptime: {} seconds\n", metrics.uptime_seconds);

    println!("=== Demo Complete ===");

    Ok(())
}
