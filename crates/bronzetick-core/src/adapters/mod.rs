mod finnhub;
mod newsapi;
mod yahoo;

pub use finnhub::{FinnhubConfig, FinnhubInsiderAdapter, DEFAULT_FINNHUB_BASE_URL};
pub use newsapi::{NewsApiAdapter, NewsApiConfig, DEFAULT_NEWSAPI_BASE_URL, DEFAULT_NEWS_DOMAINS};
pub use yahoo::{YahooChartAdapter, DEFAULT_YAHOO_BASE_URL};
