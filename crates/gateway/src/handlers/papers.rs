//! Paper search, lookup, comparison and Q&A handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::validate_body;
use crate::AppState;
use paperscout_common::{
    auth::AuthContext,
    errors::Result,
    pipeline::SearchRequest,
    Paper, RawResult,
};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FetchParams {
    #[serde(default)]
    #[validate(length(min = 1, max = 300))]
    pub topic: String,

    pub max_results: Option<usize>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    #[serde(default)]
    #[validate(length(min = 1, max = 300))]
    pub topic: String,

    pub max_results: Option<usize>,

    /// Defaults to true
    pub summarize: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AskBody {
    #[serde(default)]
    #[validate(length(min = 1, max = 2000))]
    pub question: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CompareBody {
    #[serde(default)]
    #[validate(length(min = 2, max = 10))]
    pub ids: Vec<Uuid>,
}

/// Persisted paper as returned to clients
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperResponse {
    pub id: Uuid,
    pub external_id: Option<String>,
    pub topic: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub ai_summary: Option<String>,
    pub ai_summary_at: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub source_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Paper> for PaperResponse {
    fn from(paper: Paper) -> Self {
        Self {
            ai_summary_at: paper.summary_generated_at(),
            published_at: paper.published_at.map(|at| at.with_timezone(&Utc)),
            created_at: paper.created_at.with_timezone(&Utc),
            updated_at: paper.updated_at.with_timezone(&Utc),
            id: paper.id,
            external_id: paper.external_id,
            topic: paper.topic,
            title: paper.title,
            authors: paper.authors,
            abstract_text: paper.abstract_display,
            ai_summary: paper.ai_summary,
            pdf_url: paper.pdf_url,
            source_url: paper.source_url,
        }
    }
}

/// Ranked feed result, not yet persisted
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchedPaper {
    pub external_id: Option<String>,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub source_url: Option<String>,
}

impl From<RawResult> for FetchedPaper {
    fn from(raw: RawResult) -> Self {
        Self {
            external_id: raw.external_id,
            title: raw.title,
            abstract_text: raw.abstract_text,
            authors: raw.authors,
            published_at: raw.published_at,
            pdf_url: raw.pdf_url,
            source_url: raw.source_url,
        }
    }
}

#[derive(Serialize)]
pub struct FetchResponse {
    pub papers: Vec<FetchedPaper>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub topic: String,
    pub count: usize,
    pub papers: Vec<PaperResponse>,
    pub ai_response: String,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Serialize)]
pub struct CompareResponse {
    pub comparison: String,
    pub docs: Vec<PaperResponse>,
}

/// Ranked arXiv results for a topic, without persistence or summaries
pub async fn fetch_papers(
    State(state): State<AppState>,
    Query(params): Query<FetchParams>,
) -> Result<Json<FetchResponse>> {
    validate_body(&params)?;

    let papers = state.research.fetch(&params.topic, params.max_results).await?;

    Ok(Json(FetchResponse {
        papers: papers.into_iter().map(Into::into).collect(),
    }))
}

/// Search, persist and summarize papers for a topic
pub async fn search_papers(
    State(state): State<AppState>,
    auth: AuthContext,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>> {
    validate_body(&body)?;

    tracing::info!(
        request_id = %auth.request_id,
        user_id = %auth.user_id,
        topic = %body.topic,
        "Paper search requested"
    );

    let request = SearchRequest {
        max_results: body.max_results,
        summarize: body.summarize.unwrap_or(true),
        ..SearchRequest::new(auth.user_id, body.topic)
    };
    let outcome = state.research.search(request).await?;

    Ok(Json(SearchResponse {
        topic: outcome.topic,
        count: outcome.papers.len(),
        papers: outcome.papers.into_iter().map(Into::into).collect(),
        ai_response: outcome.reply,
    }))
}

/// Get a paper by ID, including any cached summary
pub async fn get_paper(
    State(state): State<AppState>,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperResponse>> {
    let paper = state.research.get_paper(paper_id).await?;
    Ok(Json(paper.into()))
}

/// Answer a question about one paper
pub async fn ask_paper(
    State(state): State<AppState>,
    auth: AuthContext,
    Path(paper_id): Path<Uuid>,
    Json(body): Json<AskBody>,
) -> Result<Json<AskResponse>> {
    validate_body(&body)?;

    let answer = state
        .research
        .ask(&auth.user_id, paper_id, &body.question)
        .await?;

    Ok(Json(AskResponse { answer }))
}

/// Compare two or more stored papers
pub async fn compare_papers(
    State(state): State<AppState>,
    Json(body): Json<CompareBody>,
) -> Result<Json<CompareResponse>> {
    validate_body(&body)?;

    let comparison = state.research.compare(&body.ids).await?;

    Ok(Json(CompareResponse {
        comparison: comparison.narrative,
        docs: comparison.papers.into_iter().map(Into::into).collect(),
    }))
}
