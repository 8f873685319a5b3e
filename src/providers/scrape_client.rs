use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};

use crate::{
    config::ScrapeSettings,
    constants::catalog::find_subject,
    models::domain::{Question, QuestionKey},
    providers::{BlobStore, PageFetcher, ProviderError, QuestionCandidate, QuestionScraper},
    services::answer_normalization::option_for_letter,
};

const ROW_SELECTOR: &str = "div.question-item";
const TEXT_SELECTOR: &str = ".question-desc";
const OPTION_SELECTOR: &str = "ul li";
const IMAGE_SELECTOR: &str = ".question-desc img";
const LINK_SELECTOR: &str = "a";
const NEXT_SELECTOR: &str = r#"a[rel="next"]"#;
const ANSWER_LINK_TEXT: &str = "view answer";

static CORRECT_ANSWER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Correct\s+Answer:\s*Option\s*([A-D])\b").expect("answer pattern is valid")
});
static OPTION_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[A-Ea-e]\s*[.):]\s*").expect("option label pattern is valid"));

pub struct HttpPageFetcher {
    http: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, ProviderError> {
        let text = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn fetch_bytes(&self, url: &str) -> Result<(Vec<u8>, Option<String>), ProviderError> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = response.bytes().await?;
        Ok((bytes.to_vec(), content_type))
    }
}

#[derive(Debug)]
struct ListingPage {
    candidates: Vec<QuestionCandidate>,
    next_url: Option<String>,
}

fn selector(css: &str) -> Result<Selector, ProviderError> {
    Selector::parse(css).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    base.join(href).ok().map(String::from)
}

fn strip_option_label(option: &str) -> String {
    OPTION_LABEL.replace(option.trim(), "").trim().to_string()
}

fn parse_listing(
    html: &str,
    page_url: &str,
    key: &QuestionKey,
    page_index: usize,
) -> Result<ListingPage, ProviderError> {
    let base = Url::parse(page_url).map_err(|e| ProviderError::Malformed(e.to_string()))?;
    let document = Html::parse_document(html);

    let row_sel = selector(ROW_SELECTOR)?;
    let text_sel = selector(TEXT_SELECTOR)?;
    let option_sel = selector(OPTION_SELECTOR)?;
    let image_sel = selector(IMAGE_SELECTOR)?;
    let link_sel = selector(LINK_SELECTOR)?;
    let next_sel = selector(NEXT_SELECTOR)?;

    let mut candidates = Vec::new();
    for (row_index, row) in document.select(&row_sel).enumerate() {
        let question_text = row.select(&text_sel).next().map(element_text).unwrap_or_default();
        let options = row
            .select(&option_sel)
            .map(|li| strip_option_label(&element_text(li)))
            .collect();
        let image_url = row
            .select(&image_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve(&base, src));
        let answer_source_url = row
            .select(&link_sel)
            .find(|a| element_text(*a).to_lowercase().contains(ANSWER_LINK_TEXT))
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| resolve(&base, href));

        candidates.push(QuestionCandidate {
            id: Question::scrape_id(&key.year, &key.subject, page_index, row_index),
            provider_local_id: format!("{}-{}-{}", key.subject.replace(' ', "-"), page_index, row_index),
            question_text,
            options,
            answer_text: None,
            answer_source_url,
            image_url,
        });
    }

    let next_url = document
        .select(&next_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve(&base, href));

    Ok(ListingPage {
        candidates,
        next_url,
    })
}

/// Finds the `Correct Answer: Option X` marker and returns the letter.
fn parse_answer_letter(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = element_text(document.root_element());
    CORRECT_ANSWER
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
}

fn image_extension(url: &str, content_type: Option<&str>) -> String {
    let from_path = Url::parse(url).ok().and_then(|u| {
        u.path_segments()
            .and_then(|mut segments| segments.next_back().map(|s| s.to_string()))
            .and_then(|name| name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase()))
    });
    if let Some(ext) = from_path {
        if !ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ext;
        }
    }
    match content_type.map(|ct| ct.split(';').next().unwrap_or(ct).trim()) {
        Some("image/png") => "png",
        Some("image/jpeg") | Some("image/jpg") => "jpg",
        Some("image/gif") => "gif",
        Some("image/webp") => "webp",
        Some("image/svg+xml") => "svg",
        _ => "bin",
    }
    .to_string()
}

pub struct ScrapeQuestionClient {
    fetcher: Arc<dyn PageFetcher>,
    blob_store: Arc<dyn BlobStore>,
    settings: ScrapeSettings,
}

impl ScrapeQuestionClient {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        blob_store: Arc<dyn BlobStore>,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            fetcher,
            blob_store,
            settings,
        }
    }

    fn listing_url(&self, scrape_path: &str, year: &str) -> String {
        format!(
            "{}/{}?exam_type=jamb&exam_year={}&type=obj",
            self.settings.base_url, scrape_path, year
        )
    }

    async fn collect_listing(
        &self,
        key: &QuestionKey,
        first_url: String,
    ) -> Result<Vec<QuestionCandidate>, ProviderError> {
        let mut candidates = Vec::new();
        let mut next = Some(first_url);
        let mut page_index = 0;

        while let Some(url) = next.take() {
            if page_index >= self.settings.max_pages {
                log::warn!("Stopping scrape of {} at page cap {}", key, self.settings.max_pages);
                break;
            }

            let html = match self.fetcher.fetch_text(&url).await {
                Ok(html) => html,
                Err(err) if page_index == 0 => return Err(err),
                Err(err) => {
                    log::warn!("Failed to fetch listing page {} for {}: {}", url, key, err);
                    break;
                }
            };

            let page = parse_listing(&html, &url, key, page_index)?;
            log::debug!(
                "Scraped {} rows from page {} of {}",
                page.candidates.len(),
                page_index,
                key
            );
            candidates.extend(page.candidates);
            next = page.next_url;
            page_index += 1;
        }

        Ok(candidates)
    }

    async fn resolve_answer(&self, url: &str, options: &[String]) -> Result<Option<String>, ProviderError> {
        let html = self.fetcher.fetch_text(url).await?;
        Ok(parse_answer_letter(&html).and_then(|letter| option_for_letter(options, &letter)))
    }

    async fn rehost_image(&self, url: &str) -> Result<String, ProviderError> {
        let (bytes, content_type) = self.fetcher.fetch_bytes(url).await?;
        let extension = image_extension(url, content_type.as_deref());
        self.blob_store.upload(bytes, &extension).await
    }

    /// Failures only leave the affected field empty.
    async fn enrich(&self, candidate: &mut QuestionCandidate) {
        if let Some(url) = candidate.answer_source_url.clone() {
            match self.resolve_answer(&url, &candidate.options).await {
                Ok(Some(answer)) => candidate.answer_text = Some(answer),
                Ok(None) => log::warn!("No resolvable answer for {} at {}", candidate.id, url),
                Err(err) => log::warn!("Answer lookup failed for {}: {}", candidate.id, err),
            }
        }

        if let Some(url) = candidate.image_url.take() {
            match self.rehost_image(&url).await {
                Ok(hosted) => candidate.image_url = Some(hosted),
                Err(err) => log::warn!(
                    "Image re-hosting failed for {} (source image {}): {}",
                    candidate.id,
                    url,
                    err
                ),
            }
        }
    }
}

#[async_trait]
impl QuestionScraper for ScrapeQuestionClient {
    async fn scrape_subject(&self, key: &QuestionKey) -> Result<Vec<QuestionCandidate>, ProviderError> {
        let subject = find_subject(&key.subject)
            .ok_or_else(|| ProviderError::Malformed(format!("unknown subject '{}'", key.subject)))?;

        let url = self.listing_url(subject.scrape_path, &key.year);
        let mut candidates = self.collect_listing(key, url).await?;

        for (index, candidate) in candidates.iter_mut().enumerate() {
            if index > 0 && self.settings.enrich_delay > Duration::ZERO {
                tokio::time::sleep(self.settings.enrich_delay).await;
            }
            self.enrich(candidate).await;
        }

        log::info!("Scraped {} candidates for {}", candidates.len(), key);
        Ok(candidates)
    }
}
