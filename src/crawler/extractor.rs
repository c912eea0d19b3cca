//! Record extraction from directory page markup
//!
//! The default extractor understands the directory's results grid: one
//! `<tr class="rgRow">` / `<tr class="rgAltRow">` per person, with labelled
//! cells whose ids end in a field suffix.

use crate::records::DirectoryRecord;
use crate::ConfigError;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Converts one page of raw markup into directory records
pub trait RecordExtractor {
    fn extract(&self, markup: &str) -> Vec<DirectoryRecord>;
}

impl<F> RecordExtractor for F
where
    F: Fn(&str) -> Vec<DirectoryRecord>,
{
    fn extract(&self, markup: &str) -> Vec<DirectoryRecord> {
        self(markup)
    }
}

/// Extracts records from the directory results grid
pub struct HtmlTableExtractor {
    row: Selector,
    name: Selector,
    image: Selector,
    college: Selector,
    department: Selector,
    rank: Selector,
    phone: Selector,
    email: Selector,
}

impl HtmlTableExtractor {
    pub fn new() -> Result<Self, ConfigError> {
        Ok(Self {
            row: selector("tr.rgRow, tr.rgAltRow")?,
            name: selector("a.ProviderName")?,
            image: selector("input.phy-photo")?,
            college: selector("[id$='CollegeLabel']")?,
            department: selector("[id$='DeptLabel']")?,
            rank: selector("[id$='TitleLabel']")?,
            phone: selector("[id$='PhoneLabel']")?,
            email: selector("[id$='EmailLabel']")?,
        })
    }

    fn extract_row(&self, row: ElementRef<'_>) -> Option<DirectoryRecord> {
        let Some(name) = self.text_of(row, &self.name) else {
            tracing::debug!("Skipping row without a provider name");
            return None;
        };

        Some(DirectoryRecord {
            name,
            image_ref: row
                .select(&self.image)
                .next()
                .and_then(|el| el.value().attr("src"))
                .map(str::trim)
                .filter(|src| !src.is_empty())
                .map(str::to_string),
            college: self.text_of(row, &self.college),
            department: self.text_of(row, &self.department),
            rank: self.text_of(row, &self.rank),
            phone: self.text_of(row, &self.phone),
            email: self.text_of(row, &self.email),
        })
    }

    /// Trimmed text of the first match, absent when missing or blank
    fn text_of(&self, row: ElementRef<'_>, selector: &Selector) -> Option<String> {
        row.select(selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

impl RecordExtractor for HtmlTableExtractor {
    fn extract(&self, markup: &str) -> Vec<DirectoryRecord> {
        let document = Html::parse_document(markup);
        document
            .select(&self.row)
            .filter_map(|row| self.extract_row(row))
            .collect()
    }
}

/// Rewrites relative image references as absolute ones against `page`
pub fn resolve_image_refs(records: &mut [DirectoryRecord], page: &Url) {
    for record in records {
        let Some(reference) = record.image_ref.as_mut() else {
            continue;
        };
        if Url::parse(reference).is_ok() {
            continue;
        }
        match page.join(reference) {
            Ok(absolute) => *reference = absolute.to_string(),
            Err(e) => tracing::debug!(reference = %reference, "Unresolvable image reference: {}", e),
        }
    }
}

fn selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", css, e)))
}
