//! arXiv Atom API client

use super::{LiteratureFeed, RawResult, SearchQuery};
use crate::config::FeedConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::time::Duration;
use tracing::debug;

/// HTTP client for `export.arxiv.org/api/query`
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl ArxivClient {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("paperscout/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            AppError::FeedTimeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            AppError::FeedUnavailable {
                message: format!("Request failed: {}", err),
            }
        }
    }
}

#[async_trait]
impl LiteratureFeed for ArxivClient {
    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        let limit = query.limit.to_string();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", query.expression.as_str()),
                ("start", "0"),
                ("max_results", limit.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::FeedUnavailable {
                message: format!("arXiv returned HTTP {}", status),
            });
        }

        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        let results = parse_atom_feed(&body)?;

        debug!(
            expression = %query.expression,
            requested = query.limit,
            received = results.len(),
            "arXiv query complete"
        );

        Ok(results)
    }

    fn name(&self) -> &str {
        "arxiv"
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
    Published,
    AuthorName,
}

#[derive(Default)]
struct EntryBuilder {
    id: String,
    title: String,
    summary: String,
    published: String,
    authors: Vec<String>,
    author_name: String,
    pdf_url: Option<String>,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::Published => self.published.push_str(text),
            Field::AuthorName => self.author_name.push_str(text),
            Field::None => {}
        }
    }

    fn close_author(&mut self) {
        let name = normalize_whitespace(&std::mem::take(&mut self.author_name));
        if !name.is_empty() {
            self.authors.push(name);
        }
    }

    fn take_link(&mut self, element: &BytesStart<'_>) {
        let mut href = None;
        let mut is_pdf = false;

        for attr in element.attributes().flatten() {
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => continue,
            };
            match attr.key.local_name().as_ref() {
                b"href" => href = Some(value),
                b"title" if value == "pdf" => is_pdf = true,
                b"type" if value == "application/pdf" => is_pdf = true,
                _ => {}
            }
        }

        if is_pdf {
            if let Some(href) = href.filter(|h| !h.is_empty()) {
                self.pdf_url = Some(href);
            }
        }
    }

    fn finish(self) -> Result<RawResult> {
        let id = self.id.trim().to_string();

        // arXiv reports query errors as a regular entry under /api/errors
        if id.contains("/api/errors") {
            return Err(AppError::FeedUnavailable {
                message: format!("arXiv rejected the query: {}", normalize_whitespace(&self.summary)),
            });
        }

        let published_at = DateTime::parse_from_rfc3339(self.published.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc));

        Ok(RawResult {
            external_id: arxiv_id_from_url(&id),
            title: normalize_whitespace(&self.title),
            abstract_text: normalize_whitespace(&self.summary),
            authors: self.authors,
            published_at,
            pdf_url: self.pdf_url,
            source_url: (!id.is_empty()).then_some(id),
        })
    }
}

/// Parse an arXiv Atom document into raw results, in feed order
pub fn parse_atom_feed(xml: &str) -> Result<Vec<RawResult>> {
    let mut reader = Reader::from_str(xml);
    let mut results = Vec::new();
    let mut entry: Option<EntryBuilder> = None;
    let mut field = Field::None;
    let mut in_author = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    entry = Some(EntryBuilder::default());
                    field = Field::None;
                }
                b"author" => in_author = true,
                name => {
                    if let Some(current) = entry.as_mut() {
                        field = match name {
                            b"id" => Field::Id,
                            b"title" => Field::Title,
                            b"summary" => Field::Summary,
                            b"published" => Field::Published,
                            b"name" if in_author => Field::AuthorName,
                            b"link" => {
                                current.take_link(&e);
                                Field::None
                            }
                            _ => Field::None,
                        };
                    }
                }
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" {
                    if let Some(current) = entry.as_mut() {
                        current.take_link(&e);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(current) = entry.as_mut() {
                    let text = t.unescape().map_err(|e| AppError::FeedUnavailable {
                        message: format!("Malformed feed text: {}", e),
                    })?;
                    current.push_text(field, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(current) = entry.as_mut() {
                    current.push_text(field, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(done) = entry.take() {
                        results.push(done.finish()?);
                    }
                    field = Field::None;
                }
                b"author" => {
                    in_author = false;
                    if let Some(current) = entry.as_mut() {
                        current.close_author();
                    }
                }
                _ => field = Field::None,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(AppError::FeedUnavailable {
                    message: format!(
                        "Malformed feed at position {}: {}",
                        reader.error_position(),
                        e
                    ),
                });
            }
            _ => {}
        }
    }

    Ok(results)
}

/// `http://arxiv.org/abs/1706.03762v7` -> `1706.03762`
fn arxiv_id_from_url(url: &str) -> Option<String> {
    let tail = match url.find("/abs/") {
        Some(idx) => &url[idx + "/abs/".len()..],
        None => url.rsplit('/').next()?,
    };
    let tail = tail.trim_matches('/').trim();
    if tail.is_empty() {
        return None;
    }
    Some(strip_version(tail).to_string())
}

fn strip_version(id: &str) -> &str {
    match id.rfind('v') {
        Some(idx) if idx > 0 && id.len() > idx + 1 && id[idx + 1..].bytes().all(|b| b.is_ascii_digit()) => {
            &id[..idx]
        }
        _ => id,
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=ti:bert</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/1810.04805v2</id>
    <published>2018-10-11T00:50:01Z</published>
    <title>BERT: Pre-training of Deep Bidirectional
      Transformers for Language Understanding</title>
    <summary>  We introduce a new language representation model called BERT &amp; more.
    </summary>
    <author><name>Jacob Devlin</name></author>
    <author><name>Ming-Wei Chang</name><arxiv:affiliation>Google</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/1810.04805v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1810.04805v2" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/cs/9901001v1</id>
    <published>not-a-date</published>
    <title>Old Style Identifier</title>
    <summary>Legacy.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_entries_in_feed_order() {
        let results = parse_atom_feed(FEED).unwrap();
        assert_eq!(results.len(), 2);

        let bert = &results[0];
        assert_eq!(bert.external_id.as_deref(), Some("1810.04805"));
        assert_eq!(
            bert.title,
            "BERT: Pre-training of Deep Bidirectional Transformers for Language Understanding"
        );
        assert_eq!(
            bert.abstract_text,
            "We introduce a new language representation model called BERT & more."
        );
        assert_eq!(bert.authors, vec!["Jacob Devlin", "Ming-Wei Chang"]);
        assert_eq!(bert.pdf_url.as_deref(), Some("http://arxiv.org/pdf/1810.04805v2"));
        assert_eq!(bert.source_url.as_deref(), Some("http://arxiv.org/abs/1810.04805v2"));
        assert!(bert.published_at.is_some());

        let legacy = &results[1];
        assert_eq!(legacy.external_id.as_deref(), Some("cs/9901001"));
        assert!(legacy.published_at.is_none());
        assert!(legacy.pdf_url.is_none());
        assert!(legacy.authors.is_empty());
    }

    #[test]
    fn test_empty_feed() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_atom_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn test_error_entry_is_fetch_failure() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>http://arxiv.org/api/errors#incorrect_id_format_for_x</id>
            <title>Error</title>
            <summary>incorrect id format for x</summary>
        </entry></feed>"#;
        let err = parse_atom_feed(xml).unwrap_err();
        assert!(matches!(err, AppError::FeedUnavailable { .. }));
    }

    #[test]
    fn test_malformed_xml_is_fetch_failure() {
        let err = parse_atom_feed("<feed><entry><title>x</entry></feed>").unwrap_err();
        assert!(matches!(err, AppError::FeedUnavailable { .. }));
    }

    #[test]
    fn test_strip_version() {
        assert_eq!(strip_version("1706.03762v7"), "1706.03762");
        assert_eq!(strip_version("1706.03762"), "1706.03762");
        assert_eq!(strip_version("solv-int/9901001v"), "solv-int/9901001v");
    }
}
