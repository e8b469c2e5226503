use super::ui;
use crate::core::country::format_timestamp;
use crate::refresh::{RefreshPipeline, RefreshReport};
use anyhow::Result;

pub fn format_report(report: &RefreshReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Created"),
        ui::header_cell("Updated"),
        ui::header_cell("Skipped"),
        ui::header_cell("Failed"),
    ]);
    table.add_row(vec![
        report.created.to_string(),
        report.updated.to_string(),
        report.skipped.to_string(),
        report.failed.to_string(),
    ]);
    format!(
        "{} {}\n\n{}",
        ui::style_text("Refreshed at", ui::StyleType::Label),
        format_timestamp(&report.refreshed_at),
        table
    )
}

pub async fn run(pipeline: &RefreshPipeline) -> Result<()> {
    let pb = ui::new_spinner("Refreshing countries...");
    let mut stages = pipeline.watch_stage();
    let run = pipeline.run();
    tokio::pin!(run);
    let result = loop {
        tokio::select! {
            result = &mut run => break result,
            Ok(()) = stages.changed() => {
                let stage = *stages.borrow_and_update();
                pb.set_message(format!("Refreshing countries ({stage})..."));
            }
        }
    };
    pb.finish_and_clear();

    match result {
        Ok(report) => {
            println!("{}", format_report(&report));
            Ok(())
        }
        Err(e) => {
            // Data may already be committed when rendering is what failed
            if let Some(report) = &e.report {
                println!("{}", format_report(report));
            }
            eprintln!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            Err(e.into())
        }
    }
}
