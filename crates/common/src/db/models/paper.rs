//! Paper entity

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Topic of the search that last discovered this paper
    #[sea_orm(column_type = "Text", indexed)]
    pub topic: String,

    /// arXiv identifier without version suffix; unique when present
    #[sea_orm(column_type = "Text", nullable, unique)]
    pub external_id: Option<String>,

    #[sea_orm(column_type = "Text", indexed)]
    pub title: String,

    pub authors: Vec<String>,

    /// Abstract exactly as the feed delivered it on first discovery
    #[sea_orm(column_type = "Text")]
    pub abstract_raw: String,

    /// Abstract shown to users; refreshed on re-discovery
    #[sea_orm(column_type = "Text")]
    pub abstract_display: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub source_url: Option<String>,

    pub published_at: Option<DateTimeWithTimeZone>,

    #[sea_orm(column_type = "Text", nullable)]
    pub ai_summary: Option<String>,

    pub ai_summary_at: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

impl Model {
    /// Text a summary can be generated from: the raw abstract, else the display one
    pub fn source_text(&self) -> Option<&str> {
        [self.abstract_raw.as_str(), self.abstract_display.as_str()]
            .into_iter()
            .find(|text| !text.trim().is_empty())
    }

    /// Best text to describe the paper: AI summary, else the abstract
    pub fn best_text(&self) -> &str {
        self.ai_summary
            .as_deref()
            .filter(|summary| !summary.trim().is_empty())
            .or_else(|| self.source_text())
            .unwrap_or("")
    }

    pub fn summary_generated_at(&self) -> Option<DateTime<Utc>> {
        self.ai_summary_at.map(|at| at.with_timezone(&Utc))
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
