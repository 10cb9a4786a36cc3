//! Tabular reports over risks and the remediation backlog

use crate::model::Model;

/// Output format of a rendered table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableFormat {
    /// Whitespace-aligned plain text
    #[default]
    Plain,
    /// GitHub-flavored markdown
    Github,
}

impl std::str::FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(Self::Plain),
            "github" => Ok(Self::Github),
            other => Err(format!("unknown table format `{other}` (expected plain or github)")),
        }
    }
}

/// Render the risk table of the last evaluation pass
#[must_use]
pub fn risks_table(model: &Model, format: TableFormat) -> String {
    let headers = ["id", "severity", "category", "name", "target", "treatment"];
    let rows: Vec<Vec<String>> = model
        .risks()
        .map(|risk| {
            vec![
                risk.id.clone(),
                risk.severity.to_string(),
                risk.category.to_string(),
                risk.name.clone(),
                risk.target.clone(),
                model.treatment_of(risk).to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows, format)
}

/// Render the remediation backlog table
#[must_use]
pub fn backlog_table(model: &Model, format: TableFormat) -> String {
    let headers = ["id", "sub-category", "task", "state"];
    let rows: Vec<Vec<String>> = model
        .backlog()
        .iter()
        .map(|task| {
            vec![
                task.id.clone(),
                task.sub_category.clone(),
                task.text.clone(),
                task.state.to_string(),
            ]
        })
        .collect();
    render_table(&headers, &rows, format)
}

fn render_table(headers: &[&str], rows: &[Vec<String>], format: TableFormat) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let mut out = String::new();
    match format {
        TableFormat::Plain => {
            push_plain_row(&mut out, headers.iter().map(|h| (*h).to_string()), &widths);
            push_plain_row(
                &mut out,
                widths.iter().map(|w| "-".repeat(*w)),
                &widths,
            );
            for row in rows {
                push_plain_row(&mut out, row.iter().cloned(), &widths);
            }
        },
        TableFormat::Github => {
            push_github_row(&mut out, headers.iter().map(|h| (*h).to_string()), &widths);
            push_github_row(
                &mut out,
                widths.iter().map(|w| "-".repeat((*w).max(3))),
                &widths,
            );
            for row in rows {
                push_github_row(&mut out, row.iter().cloned(), &widths);
            }
        },
    }
    out
}

fn push_plain_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let line: Vec<String> =
        cells.zip(widths).map(|(cell, &w)| format!("{cell:<w$}")).collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

fn push_github_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let line: Vec<String> =
        cells.zip(widths).map(|(cell, &w)| format!("{cell:<w$}", w = w.max(3))).collect();
    out.push_str("| ");
    out.push_str(&line.join(" | "));
    out.push_str(" |\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::Asset;
    use crate::component::{Component, Technology};
    use crate::data_flow::{DataFlow, Protocol};
    use crate::score::Score;

    fn make_model() -> Model {
        let mut model = Model::new("Demo");
        let user = model.add_component(Component::actor("User")).unwrap();
        let app = model
            .add_component(
                Component::process("WebApp").with_technology(Technology::WebApplication),
            )
            .unwrap();
        let asset =
            model.add_asset(Asset::new("Data", Score::LOW, Score::LOW, Score::LOW)).unwrap();
        let flow = model
            .add_data_flow(DataFlow::new("WebTraffic", user, app, Protocol::Https))
            .unwrap();
        model.transfers(flow, asset);
        model.evaluate().unwrap();
        model
    }

    #[test]
    fn plain_table_lists_every_risk() {
        let model = make_model();
        let table = risks_table(&model, TableFormat::Plain);
        for risk in model.risks() {
            assert!(table.contains(&risk.id), "missing row for {}", risk.id);
        }
        assert!(table.starts_with("id"));
    }

    #[test]
    fn github_table_uses_pipes_and_a_separator() {
        let model = make_model();
        let table = risks_table(&model, TableFormat::Github);
        let mut lines = table.lines();
        assert!(lines.next().unwrap().starts_with("| id"));
        assert!(lines.next().unwrap().contains("---"));
    }

    #[test]
    fn backlog_table_lists_task_states() {
        let model = make_model();
        let table = backlog_table(&model, TableFormat::Plain);
        assert!(table.contains("open"));
        assert!(table.contains("sub-category"));
    }

    #[test]
    fn format_parses_from_str() {
        assert_eq!("plain".parse::<TableFormat>().unwrap(), TableFormat::Plain);
        assert_eq!("github".parse::<TableFormat>().unwrap(), TableFormat::Github);
        assert!("csv".parse::<TableFormat>().is_err());
    }
}
