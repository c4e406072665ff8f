pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::error::{ParseError, ScrapeError};
use crate::models::{MatchRow, MatchUrl, Season};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};
use url::Url;

use self::http_client::HttpClient;
use self::parsers::{parse_match_page, parse_round_page};

// ── Source trait ──────────────────────────────────────────────────────────────

/// Where round listings and match report pages come from.
#[async_trait]
pub trait MatchSource: Send + Sync + 'static {
    async fn fetch_round_urls(&self, season: &Season, round: u32) -> Result<Vec<MatchUrl>, ScrapeError>;
    async fn fetch_match_page(&self, url: &MatchUrl) -> Result<String, ScrapeError>;
}

/// Turns one match report page into a row.
pub trait ReportParser: Send + Sync {
    fn parse(&self, html: &str) -> Result<MatchRow, ParseError>;
}

/// Parser for legaseriea.it match report pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchReportParser;

impl ReportParser for MatchReportParser {
    fn parse(&self, html: &str) -> Result<MatchRow, ParseError> {
        parse_match_page(html)
    }
}

// ── legaseriea.it scraper ─────────────────────────────────────────────────────

pub struct LegaSerieAScraper {
    client: HttpClient,
    base_url: Url,
    site_path_prefix: String,
}

impl LegaSerieAScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        // Url::join drops the last segment unless the base ends with '/'
        let mut base = config.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client: HttpClient::new(config)?,
            base_url: Url::parse(&base)
                .with_context(|| format!("Invalid base URL {}", config.base_url))?,
            site_path_prefix: config.site_path_prefix.clone(),
        })
    }

    /// e.g. 2005-06 round 1 → {base}archivio/2005-06/UNICO/UNI/1
    fn archive_url(&self, season: &Season, round: u32) -> Result<Url, ScrapeError> {
        Ok(self
            .base_url
            .join(&format!("archivio/{}", season.round_path(round)))?)
    }

    fn match_url(&self, url: &MatchUrl) -> Result<Url, ScrapeError> {
        Ok(self.base_url.join(url.as_str())?)
    }
}

#[async_trait]
impl MatchSource for LegaSerieAScraper {
    async fn fetch_round_urls(&self, season: &Season, round: u32) -> Result<Vec<MatchUrl>, ScrapeError> {
        let url = self.archive_url(season, round)?;
        info!("Fetching archive page {}", url);

        let html = self.client.get_text(&url).await?;
        let urls = parse_round_page(&html, &self.site_path_prefix, season, round).map_err(
            |source| ScrapeError::Parse {
                url: url.to_string(),
                source,
            },
        )?;

        if urls.is_empty() {
            warn!("{} round {}: no match report links on {}", season, round, url);
        }
        Ok(urls)
    }

    async fn fetch_match_page(&self, url: &MatchUrl) -> Result<String, ScrapeError> {
        let url = self.match_url(url)?;
        let html = self.client.get_text(&url).await?;
        debug!("{}: {} bytes", url, html.len());
        Ok(html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio_test::assert_ok;

    /// Serves canned bodies by request path on 127.0.0.1; unknown paths get 404.
    /// Returns the site base URL pointing at it.
    async fn serve(routes: &[(&str, &str)]) -> String {
        let routes: Arc<HashMap<String, String>> = Arc::new(
            routes
                .iter()
                .map(|(path, body)| (path.to_string(), body.to_string()))
                .collect(),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                tokio::spawn(async move {
                    let mut buf = vec![0u8; 8192];
                    let mut read = 0;
                    while read < buf.len() {
                        let n = stream.read(&mut buf[read..]).await.unwrap_or(0);
                        if n == 0 {
                            break;
                        }
                        read += n;
                        if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }

                    let request = String::from_utf8_lossy(&buf[..read]);
                    let path = request.split_whitespace().nth(1).unwrap_or("/");
                    let (status, body) = match routes.get(path) {
                        Some(body) => ("200 OK", body.clone()),
                        None => ("404 Not Found", "not found".to_string()),
                    };
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("http://{}/it/serie-a/", addr)
    }

    fn scraper_with_base(base_url: &str) -> LegaSerieAScraper {
        let mut config = AppConfig::default().scraper;
        config.base_url = base_url.to_string();
        LegaSerieAScraper::new(&config).unwrap()
    }

    #[test]
    fn test_archive_url() {
        let scraper = scraper_with_base("https://www.legaseriea.it/it/serie-a/");
        let url = scraper.archive_url(&Season::new(2005), 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.legaseriea.it/it/serie-a/archivio/2005-06/UNICO/UNI/1"
        );
    }

    #[test]
    fn test_match_url_without_trailing_slash_base() {
        let scraper = scraper_with_base("https://www.legaseriea.it/it/serie-a");
        let url = scraper
            .match_url(&MatchUrl::new("match-report/2005-06/UNICO/UNI/1/juventus-chievo"))
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.legaseriea.it/it/serie-a/match-report/2005-06/UNICO/UNI/1/juventus-chievo"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let mut config = AppConfig::default().scraper;
        config.base_url = "not a url".into();
        assert!(LegaSerieAScraper::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_fetch_round_urls_from_archive_page() {
        let archive = r#"<html><body>
            <a href="/it/serie-a/match-report/2005-06/UNICO/UNI/1/juventus-chievo">Juventus - Chievo</a>
            <a href="/it/serie-a/match-report/2005-06/UNICO/UNI/10/roma-lazio">Roma - Lazio</a>
            <a href="/it/serie-a/match-report/2005-06/UNICO/UNI/1/ascoli-udinese">Ascoli - Udinese</a>
        </body></html>"#;
        let base = serve(&[("/it/serie-a/archivio/2005-06/UNICO/UNI/1", archive)]).await;
        let scraper = scraper_with_base(&base);

        let urls = assert_ok!(scraper.fetch_round_urls(&Season::new(2005), 1).await);
        assert_eq!(
            urls,
            vec![
                MatchUrl::new("match-report/2005-06/UNICO/UNI/1/juventus-chievo"),
                MatchUrl::new("match-report/2005-06/UNICO/UNI/1/ascoli-udinese"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fetch_match_page_returns_body() {
        let base = serve(&[(
            "/it/serie-a/match-report/2005-06/UNICO/UNI/1/juventus-chievo",
            "<html>report</html>",
        )])
        .await;
        let scraper = scraper_with_base(&base);

        let html = assert_ok!(
            scraper
                .fetch_match_page(&MatchUrl::new("match-report/2005-06/UNICO/UNI/1/juventus-chievo"))
                .await
        );
        assert_eq!(html, "<html>report</html>");
    }

    #[tokio::test]
    async fn test_not_found_is_status_error() {
        let base = serve(&[]).await;
        let scraper = scraper_with_base(&base);

        let err = scraper
            .fetch_match_page(&MatchUrl::new("match-report/2005-06/UNICO/UNI/1/missing"))
            .await
            .unwrap_err();
        match err {
            ScrapeError::Status { status, url } => {
                assert_eq!(status, reqwest::StatusCode::NOT_FOUND);
                assert!(url.ends_with("/it/serie-a/match-report/2005-06/UNICO/UNI/1/missing"));
            }
            other => panic!("expected Status error, got {:?}", other),
        }

        let err = scraper.fetch_round_urls(&Season::new(2005), 3).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Status { .. }));
    }

    #[tokio::test]
    async fn test_refused_connection_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let scraper = scraper_with_base(&format!("http://{}/it/serie-a/", addr));
        let err = scraper.fetch_round_urls(&Season::new(2005), 1).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Network { .. }));
    }
}
