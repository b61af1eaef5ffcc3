// Shared fixtures for the behavior tests
pub use bronzetick_core::{
    ChatSentimentClassifier, ClassifierConfig, CsvFallbackWriter, FinnhubConfig,
    FinnhubInsiderAdapter, HttpResponse, IngestionWriter, JobSink, NewsApiAdapter, NewsApiConfig,
    PacingConfig, ScriptedHttpClient, Symbol, Warehouse, WarehouseConfig, YahooChartAdapter,
};
pub use std::sync::Arc;

use std::path::Path;

/// Chart body with one complete daily row per `(unix_seconds, close)`.
pub fn chart_body(rows: &[(i64, f64)]) -> String {
    let timestamps: Vec<i64> = rows.iter().map(|(seconds, _)| *seconds).collect();
    let closes: Vec<f64> = rows.iter().map(|(_, close)| *close).collect();
    let opens: Vec<f64> = closes.iter().map(|close| close - 1.0).collect();
    let highs: Vec<f64> = closes.iter().map(|close| close + 2.0).collect();
    let lows: Vec<f64> = closes.iter().map(|close| close - 2.0).collect();
    let volumes: Vec<u64> = (1..=rows.len() as u64).map(|n| n * 1_000).collect();

    serde_json::json!({
        "chart": {
            "result": [{
                "timestamp": timestamps,
                "indicators": { "quote": [{
                    "open": opens,
                    "high": highs,
                    "low": lows,
                    "close": closes,
                    "volume": volumes,
                }]},
            }],
            "error": null,
        }
    })
    .to_string()
}

/// 2024-01-02, 2024-01-03 and 2024-01-04 at the US market open.
pub const JAN_2_3_4: [i64; 3] = [1_704_205_800, 1_704_292_200, 1_704_378_600];

/// News search body with `(title, description, published_at)` articles.
pub fn news_body(articles: &[(&str, &str, &str)]) -> String {
    let articles: Vec<serde_json::Value> = articles
        .iter()
        .map(|(title, description, published_at)| {
            serde_json::json!({
                "title": title,
                "description": description,
                "url": format!("https://news.test/{}", title.len()),
                "publishedAt": published_at,
            })
        })
        .collect();
    serde_json::json!({ "status": "ok", "totalResults": articles.len(), "articles": articles })
        .to_string()
}

/// Chat completion whose single choice answers `content`.
pub fn completion(content: &str) -> HttpResponse {
    HttpResponse::ok_json(
        serde_json::json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
            .to_string(),
    )
}

pub fn healthy_store(dir: &Path) -> Warehouse {
    Warehouse::new(WarehouseConfig::in_home(dir.join("home")))
}

/// A store whose database path is an existing directory, so it never opens.
pub fn unreachable_store(dir: &Path) -> Warehouse {
    let blocker = dir.join("blocked.duckdb");
    std::fs::create_dir_all(&blocker).expect("blocker dir");
    Warehouse::new(WarehouseConfig {
        home: dir.to_path_buf(),
        db_path: blocker,
    })
}

pub fn store_sink(warehouse: Warehouse, dir: &Path) -> JobSink {
    JobSink::Store {
        writer: IngestionWriter::new(warehouse, CsvFallbackWriter::new(dir.join("raw_data"))),
        watchlist: bronzetick_core::config::default_watchlist(),
    }
}

pub fn export_sink(dir: &Path) -> JobSink {
    JobSink::Export(CsvFallbackWriter::new(dir.join("raw_data")))
}

pub fn news_config() -> NewsApiConfig {
    NewsApiConfig {
        api_key: Some(String::from("news-key")),
        ..NewsApiConfig::default()
    }
}

pub fn classifier_config() -> ClassifierConfig {
    ClassifierConfig {
        api_key: Some(String::from("groq-key")),
        ..ClassifierConfig::default()
    }
}

pub fn finnhub_config() -> FinnhubConfig {
    FinnhubConfig {
        api_key: Some(String::from("fh-key")),
        ..FinnhubConfig::default()
    }
}

pub fn symbols(list: &str) -> Vec<Symbol> {
    Symbol::parse_list(list).expect("symbols")
}
