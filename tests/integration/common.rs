//! Shared fixtures for the integration tests

use directory_harvest::config::{
    Config, EnrichmentConfig, FetcherConfig, OutputConfig, SourceConfig, UserAgentConfig,
};
use std::path::Path;

/// One row of the directory results grid
pub struct Row<'a> {
    pub name: &'a str,
    pub image: Option<&'a str>,
    pub department: Option<&'a str>,
}

impl<'a> Row<'a> {
    pub fn new(name: &'a str) -> Self {
        Self {
            name,
            image: None,
            department: None,
        }
    }

    pub fn image(mut self, src: &'a str) -> Self {
        self.image = Some(src);
        self
    }

    pub fn department(mut self, department: &'a str) -> Self {
        self.department = Some(department);
        self
    }
}

/// Renders a results page the way the directory site does
pub fn directory_page(rows: &[Row<'_>], next_href: Option<&str>) -> String {
    let mut html = String::from("<html><body><table class=\"rgMasterTable\"><tbody>\n");

    for (i, row) in rows.iter().enumerate() {
        let class = if i % 2 == 0 { "rgRow" } else { "rgAltRow" };
        html.push_str(&format!("<tr class=\"{}\"><td>", class));
        if let Some(src) = row.image {
            html.push_str(&format!("<input type=\"image\" class=\"phy-photo\" src=\"{}\"/>", src));
        }
        html.push_str(&format!(
            "<a class=\"ProviderName\" href=\"#\">{}</a>",
            row.name
        ));
        if let Some(department) = row.department {
            html.push_str(&format!(
                "<span id=\"grid_ctl0{}_DeptLabel\">{}</span>",
                i, department
            ));
        }
        html.push_str("</td></tr>\n");
    }

    html.push_str("</tbody></table>\n");
    if let Some(href) = next_href {
        html.push_str(&format!(
            "<a class=\"rgPageNext\" href=\"{}\">Next</a>\n",
            href
        ));
    }
    html.push_str("</body></html>");
    html
}

/// Creates a test configuration pointed at a mock server
///
/// Pagination settles instantly and retries back off in milliseconds.
pub fn test_config(base_url: &str, data_dir: &Path, partitions: &[&str]) -> Config {
    Config {
        source: SourceConfig {
            url_template: format!("{}/directory/{{partition}}", base_url),
            next_selector: "a.rgPageNext".to_string(),
            settle_ms: 0,
            max_pages: 50,
            partitions: Some(partitions.iter().map(|p| p.to_string()).collect()),
            persist_partial: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestHarvester".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        fetcher: FetcherConfig {
            max_attempts: 5,
            min_backoff_ms: 1,
            max_backoff_ms: 4,
            timeout_secs: 5,
            deadline_secs: None,
        },
        enrichment: EnrichmentConfig {
            service_url: Some(base_url.to_string()),
            no_image_sentinel: "NoImageProvided.png".to_string(),
            timeout_ms: 2_000,
        },
        output: OutputConfig {
            data_dir: data_dir.display().to_string(),
            database_path: data_dir.join("harvest.db").display().to_string(),
            summary_path: data_dir.join("summary.md").display().to_string(),
        },
    }
}
