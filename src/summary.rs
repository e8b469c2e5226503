//! Rendering of the summary artifact: country count, top five by estimated
//! GDP and the time of the last refresh, drawn on a fixed-size canvas.

use crate::core::country::{CountryRecord, ListQuery, SortMode, format_timestamp};
use crate::core::error::{AppError, AppResult};
use crate::core::store::CountryStore;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

pub const TOP_N: usize = 5;
const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const FALLBACK_FONT_FAMILY: &str = "sans-serif";
const EMBEDDED_FONT_FAMILY: &str = "SummaryFont";

#[derive(Debug, Clone, PartialEq)]
pub struct RankedCountry {
    pub name: String,
    pub estimated_gdp: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryData {
    pub total_countries: usize,
    pub top: Vec<RankedCountry>,
    pub last_refreshed_at: Option<DateTime<Utc>>,
}

impl SummaryData {
    /// Takes the first `TOP_N` records by descending estimated GDP.
    pub fn from_records(
        mut records: Vec<CountryRecord>,
        last_refreshed_at: Option<DateTime<Utc>>,
    ) -> Self {
        let total_countries = records.len();
        let ranking = ListQuery {
            sort: SortMode::GdpDesc,
            ..Default::default()
        };
        ranking.apply(&mut records);
        let top = records
            .into_iter()
            .take(TOP_N)
            .map(|r| RankedCountry {
                name: r.name,
                estimated_gdp: r.estimated_gdp,
            })
            .collect();
        SummaryData {
            total_countries,
            top,
            last_refreshed_at,
        }
    }

    pub async fn load(store: &dyn CountryStore) -> AppResult<Self> {
        let records = store.list().await?;
        let status = store.status().await?;
        Ok(Self::from_records(
            records,
            status.map(|s| s.last_refreshed_at),
        ))
    }

    /// Text lines in drawing order, without styling.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Country Summary".to_string(),
            format!("Total countries: {}", self.total_countries),
            "Top 5 by estimated GDP:".to_string(),
        ];
        for (i, country) in self.top.iter().enumerate() {
            let gdp = country
                .estimated_gdp
                .map_or("N/A".to_string(), |g| format!("{g:.2}"));
            lines.push(format!("{}. {}: {}", i + 1, country.name, gdp));
        }
        let ts = self
            .last_refreshed_at
            .as_ref()
            .map_or("N/A".to_string(), format_timestamp);
        lines.push(format!("Last refresh: {ts}"));
        lines
    }
}

pub trait SummaryRenderer: Send + Sync {
    fn render(&self, data: &SummaryData) -> AppResult<Vec<u8>>;

    fn content_type(&self) -> &'static str;
}

/// Renders the summary as an 800x600 SVG document.
///
/// A configured font file is embedded into the document. When it cannot be
/// read the generic sans-serif family is used instead.
pub struct SvgRenderer {
    font_path: Option<PathBuf>,
}

impl SvgRenderer {
    pub fn new(font_path: Option<PathBuf>) -> Self {
        SvgRenderer { font_path }
    }

    fn font_face(&self) -> Option<String> {
        let path = self.font_path.as_ref()?;
        match std::fs::read(path) {
            Ok(bytes) => {
                let mime = match path.extension().and_then(|e| e.to_str()) {
                    Some("otf") => "font/otf",
                    Some("woff") => "font/woff",
                    Some("woff2") => "font/woff2",
                    _ => "font/ttf",
                };
                debug!("Embedding font from {}", path.display());
                Some(format!(
                    "@font-face {{ font-family: '{EMBEDDED_FONT_FAMILY}'; src: url(data:{mime};base64,{}); }}",
                    STANDARD.encode(bytes)
                ))
            }
            Err(e) => {
                warn!(
                    "Could not load font {}: {}. Falling back to {}",
                    path.display(),
                    e,
                    FALLBACK_FONT_FAMILY
                );
                None
            }
        }
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

impl SummaryRenderer for SvgRenderer {
    fn render(&self, data: &SummaryData) -> AppResult<Vec<u8>> {
        let font_face = self.font_face();
        let family = match font_face {
            Some(_) => format!("'{EMBEDDED_FONT_FAMILY}', {FALLBACK_FONT_FAMILY}"),
            None => FALLBACK_FONT_FAMILY.to_string(),
        };

        let lines = data.lines();
        let (title, rest) = lines
            .split_first()
            .ok_or_else(|| AppError::Render("nothing to draw".to_string()))?;
        let (footer, body) = rest
            .split_last()
            .ok_or_else(|| AppError::Render("nothing to draw".to_string()))?;

        let mut svg = String::new();
        let render_err = |e: std::fmt::Error| AppError::Render(e.to_string());
        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
        )
        .map_err(render_err)?;
        writeln!(
            svg,
            "<style>{} text {{ font-family: {family}; fill: #000000; }}</style>",
            font_face.unwrap_or_default()
        )
        .map_err(render_err)?;
        writeln!(svg, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##).map_err(render_err)?;
        writeln!(
            svg,
            r#"<text x="20" y="40" font-size="32" dominant-baseline="hanging">{}</text>"#,
            escape_xml(title)
        )
        .map_err(render_err)?;

        // Count and heading, then the ranked entries indented below them
        let mut y = 100;
        for (i, line) in body.iter().enumerate() {
            let x = if i < 2 { 20 } else { 40 };
            writeln!(
                svg,
                r#"<text x="{x}" y="{y}" font-size="24" dominant-baseline="hanging">{}</text>"#,
                escape_xml(line)
            )
            .map_err(render_err)?;
            y += if i < 2 { 60 } else { 50 };
        }

        writeln!(
            svg,
            r#"<text x="20" y="{}" font-size="20" dominant-baseline="hanging">{}</text>"#,
            HEIGHT - 60,
            escape_xml(footer)
        )
        .map_err(render_err)?;
        svg.push_str("</svg>\n");
        Ok(svg.into_bytes())
    }

    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

/// The rendered summary on disk at a fixed, overwritable location.
#[derive(Debug, Clone)]
pub struct SummaryArtifact {
    path: PathBuf,
}

impl SummaryArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SummaryArtifact { path: path.into() }
    }

    /// Replaces the artifact. Readers see either the old or the new file.
    pub async fn write(&self, bytes: &[u8]) -> AppResult<()> {
        let render_err = |e: std::io::Error| {
            AppError::Render(format!("Failed to write {}: {e}", self.path.display()))
        };
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(render_err)?;
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(render_err)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(render_err)?;
        debug!("Wrote summary to {}", self.path.display());
        Ok(())
    }

    pub async fn read(&self) -> AppResult<Vec<u8>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Summary image".to_string()))
            }
            Err(e) => Err(AppError::persistence(e)),
        }
    }
}
