use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::field::{AnnotatedRunner, RaceCard};

pub struct ExportReport {
    pub races: usize,
    pub runners: usize,
    pub unmatched: usize,
}

pub fn export_race_cards(path: &Path, cards: &[RaceCard]) -> Result<ExportReport> {
    let mut runner_rows = vec![vec![
        "Meeting".to_string(),
        "Race".to_string(),
        "Local Time".to_string(),
        "Tab".to_string(),
        "Horse".to_string(),
        "Rating".to_string(),
        "Price".to_string(),
        "Value".to_string(),
        "Value Rank".to_string(),
        "Scratched".to_string(),
        "Reason".to_string(),
    ]];
    let mut unmatched_rows = vec![vec![
        "Meeting".to_string(),
        "Race".to_string(),
        "Tab".to_string(),
        "Horse".to_string(),
        "Scratched At".to_string(),
        "Reason".to_string(),
    ]];

    for card in cards {
        for runner in &card.runners {
            runner_rows.push(runner_row(card, runner));
        }
        for s in &card.unmatched_scratchings {
            unmatched_rows.push(vec![
                card.meeting_id.clone(),
                card.race_number.to_string(),
                opt_to_string(s.tab_number),
                s.horse_name.clone(),
                s.scratching_time.clone().unwrap_or_default(),
                s.reason.clone().unwrap_or_default(),
            ]);
        }
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Runners")?;
        write_rows(sheet, &runner_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Unmatched")?;
        write_rows(sheet, &unmatched_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        races: cards.len(),
        runners: runner_rows.len().saturating_sub(1),
        unmatched: unmatched_rows.len().saturating_sub(1),
    })
}

fn runner_row(card: &RaceCard, runner: &AnnotatedRunner) -> Vec<String> {
    vec![
        card.meeting_id.clone(),
        card.race_number.to_string(),
        runner.local_jump_time().unwrap_or_default(),
        opt_to_string(runner.row.tab_number),
        runner.row.horse_name.clone(),
        opt_to_string(runner.row.rating),
        opt_to_string(runner.price),
        runner
            .value_score
            .map(|v| format!("{v:.1}"))
            .unwrap_or_default(),
        opt_to_string(runner.value_rank),
        if runner.scratched {
            "yes".to_string()
        } else {
            "no".to_string()
        },
        runner.scratching_reason.clone().unwrap_or_default(),
    ]
}

fn opt_to_string<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
