//! Resolves the image behind a gallery submission by reading the rendered
//! post page.
//!
//! The anchor is located by the class names Reddit's web app used at the
//! time of writing. Any change to that markup makes every lookup fail with
//! [`ScrapeError::ElementNotFound`]; callers treat the image as absent.

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use sync_core::{CoreError, GalleryResolver, ScrapeError};
use tracing::debug;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_10_1) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/39.0.2171.95 Safari/537.36";

const GALLERY_ANCHOR_SELECTOR: &str = "a._3BxRNDoASi9FbGX01ewiLg.iUP9nbvcaxfwKrQTgt0sw";

#[derive(Debug, Clone)]
pub struct GalleryScraper {
    http_client: Client,
}

impl GalleryScraper {
    pub fn new() -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { http_client })
    }

    async fn fetch_page(&self, page_url: &str) -> Result<String, ScrapeError> {
        let response = self
            .http_client
            .get(page_url)
            .send()
            .await
            .map_err(|e| ScrapeError::PageUnreachable {
                url: page_url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::BadStatus {
                url: page_url.to_string(),
                status_code: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ScrapeError::PageUnreachable {
                url: page_url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl GalleryResolver for GalleryScraper {
    async fn resolve_gallery_image(&self, page_url: &str) -> Result<String, CoreError> {
        debug!("Resolving gallery image from {}", page_url);
        let body = self.fetch_page(page_url).await?;

        extract_gallery_image(&body).ok_or_else(|| {
            CoreError::Scrape(ScrapeError::ElementNotFound {
                url: page_url.to_string(),
            })
        })
    }
}

/// `href` of the first gallery anchor in a post page, if any.
pub fn extract_gallery_image(html: &str) -> Option<String> {
    let selector = Selector::parse(GALLERY_ANCHOR_SELECTOR).ok()?;
    let document = Html::parse_document(html);
    let href = document
        .select(&selector)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .map(str::to_string);
    href
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_first_matching_anchor() {
        let html = r#"
            <html><body>
              <a class="other" href="https://example.com/nope">x</a>
              <a class="_3BxRNDoASi9FbGX01ewiLg iUP9nbvcaxfwKrQTgt0sw" href="https://preview.redd.it/first.jpg">1</a>
              <a class="_3BxRNDoASi9FbGX01ewiLg iUP9nbvcaxfwKrQTgt0sw" href="https://preview.redd.it/second.jpg">2</a>
            </body></html>
        "#;

        assert_eq!(
            extract_gallery_image(html).as_deref(),
            Some("https://preview.redd.it/first.jpg")
        );
    }

    #[test]
    fn test_missing_anchor_yields_none() {
        let html = r#"<html><body><a class="_3BxRNDoASi9FbGX01ewiLg">x</a></body></html>"#;
        assert_eq!(extract_gallery_image(html), None);
    }

    #[test]
    fn test_anchor_without_href_yields_none() {
        let html =
            r#"<a class="_3BxRNDoASi9FbGX01ewiLg iUP9nbvcaxfwKrQTgt0sw">no link</a>"#;
        assert_eq!(extract_gallery_image(html), None);
    }

    #[tokio::test]
    async fn test_resolve_against_mock_page() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/r/pics/comments/abc/gallery_post/")
            .with_status(200)
            .with_body(
                r#"<a class="_3BxRNDoASi9FbGX01ewiLg iUP9nbvcaxfwKrQTgt0sw" href="https://preview.redd.it/img.png">img</a>"#,
            )
            .create_async()
            .await;
        let _gone = server
            .mock("GET", "/r/pics/comments/gone/")
            .with_status(404)
            .create_async()
            .await;

        let scraper = GalleryScraper::new().unwrap();

        let url = format!("{}/r/pics/comments/abc/gallery_post/", server.url());
        assert_eq!(
            scraper.resolve_gallery_image(&url).await.unwrap(),
            "https://preview.redd.it/img.png"
        );

        let missing = format!("{}/r/pics/comments/gone/", server.url());
        assert!(matches!(
            scraper.resolve_gallery_image(&missing).await,
            Err(CoreError::Scrape(ScrapeError::BadStatus {
                status_code: 404,
                ..
            }))
        ));
    }
}
