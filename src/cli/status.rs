use super::ui;
use crate::core::country::StatusView;
use crate::service::CountryService;
use anyhow::Result;

pub fn format_status(status: &StatusView) -> String {
    let last = match &status.last_refreshed_at {
        Some(ts) => ui::style_text(ts, ui::StyleType::Value),
        None => ui::style_text("never", ui::StyleType::Subtle),
    };
    format!(
        "{} {}\n{} {}",
        ui::style_text("Total countries:", ui::StyleType::Label),
        ui::style_text(&status.total_countries.to_string(), ui::StyleType::Value),
        ui::style_text("Last refreshed:", ui::StyleType::Label),
        last
    )
}

pub async fn run(service: &CountryService) -> Result<()> {
    println!("{}", format_status(&service.status().await?));
    Ok(())
}
