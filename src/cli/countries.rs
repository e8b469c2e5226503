use super::ui;
use crate::core::country::{CountryView, ListQuery};
use crate::service::CountryService;
use anyhow::Result;
use comfy_table::Cell;

pub fn listing_table(countries: &[CountryView]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Country"),
        ui::header_cell("Region"),
        ui::header_cell("Population"),
        ui::header_cell("Currency"),
        ui::header_cell("Rate (per USD)"),
        ui::header_cell("Estimated GDP"),
    ]);

    for country in countries {
        table.add_row(vec![
            Cell::new(&country.name),
            ui::text_cell(country.region.as_deref()),
            ui::format_optional_cell(Some(country.population), |p| {
                ui::format_amount(p as f64).trim_end_matches(".00").to_string()
            }),
            ui::text_cell(country.currency_code.as_deref()),
            ui::format_optional_cell(country.exchange_rate, |r| format!("{r:.4}")),
            ui::format_optional_cell(country.estimated_gdp, ui::format_amount),
        ]);
    }
    table.to_string()
}

pub fn detail_table(country: &CountryView) -> String {
    let mut table = ui::new_styled_table();
    let rows = [
        ("Capital", country.capital.clone()),
        ("Region", country.region.clone()),
        ("Population", Some(country.population.to_string())),
        ("Currency", country.currency_code.clone()),
        ("Exchange rate", country.exchange_rate.map(|r| format!("{r:.4}"))),
        ("Estimated GDP", country.estimated_gdp.map(ui::format_amount)),
        ("Flag", country.flag_url.clone()),
        ("Last refreshed", Some(country.last_refreshed_at.clone())),
    ];
    for (label, value) in rows {
        table.add_row(vec![ui::header_cell(label), ui::text_cell(value.as_deref())]);
    }
    format!(
        "{}\n\n{}",
        ui::style_text(&country.name, ui::StyleType::Title),
        table
    )
}

pub async fn list(service: &CountryService, query: &ListQuery) -> Result<()> {
    let countries = service.list_countries(query).await?;
    if countries.is_empty() {
        println!(
            "{}",
            ui::style_text("No countries stored. Run `gdpx refresh` first.", ui::StyleType::Subtle)
        );
        return Ok(());
    }
    println!("{}", listing_table(&countries));
    println!(
        "\n{} {}",
        ui::style_text("Countries:", ui::StyleType::Label),
        ui::style_text(&countries.len().to_string(), ui::StyleType::Value)
    );
    Ok(())
}

pub async fn show(service: &CountryService, name: &str) -> Result<()> {
    let country = service.get_country(name).await?;
    println!("{}", detail_table(&country));
    Ok(())
}

pub async fn delete(service: &CountryService, name: &str) -> Result<()> {
    service.delete_country(name).await?;
    println!("Deleted {}", ui::style_text(name, ui::StyleType::Label));
    Ok(())
}
