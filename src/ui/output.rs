//! ui::output
//!
//! Rendering of command results.
//!
//! # Design
//!
//! Every renderable type declares its columns next to its definition via
//! [`Tabular`]. A column is a key, a header, and a projector function; no
//! reflection is involved.
//!
//! Modes, in priority order:
//! 1. `--template`: the template runs once per record over its JSON form
//! 2. `--output json`: the records are printed as a pretty JSON array
//! 3. `--format`: only the named columns, in the order given
//! 4. every declared column
//!
//! Text tables are laid out by `comfy_table` without borders: columns are
//! padded to the widest cell plus four spaces. `--no-header` drops the
//! header line.

use std::io::{self, Write};
use std::str::FromStr;

use comfy_table::{presets, Cell, CellAlignment, ContentArrangement, Table};
use serde::Serialize;
use thiserror::Error;

use super::template::{Template, TemplateError};
use crate::core::config::{settings, Effective};

/// Spacing added after each column but the last.
pub const COLUMN_GAP: u16 = 4;

/// Errors from rendering output.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown column {name:?}, valid columns: {}", .available.join(", "))]
    UnknownColumn {
        name: String,
        available: Vec<String>,
    },

    #[error("unknown output type {0:?}, valid types: text, json")]
    UnknownOutput(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to serialize output: {0}")]
    Serialize(String),

    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

/// One output column.
pub struct Column<T> {
    /// Name accepted by `--format`.
    pub key: &'static str,
    pub header: &'static str,
    pub project: fn(&T) -> String,
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Column<T> {}

impl<T> Column<T> {
    pub const fn new(key: &'static str, header: &'static str, project: fn(&T) -> String) -> Self {
        Self {
            key,
            header,
            project,
        }
    }
}

/// A record that can be displayed as a table row.
pub trait Tabular: Serialize + Sized {
    /// Columns in default display order.
    fn columns() -> Vec<Column<Self>>;
}

/// Output type selected with `--output`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputType {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "" | "text" => Ok(OutputType::Text),
            "json" => Ok(OutputType::Json),
            other => Err(RenderError::UnknownOutput(other.to_string())),
        }
    }
}

/// Display options for one invocation.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub output: OutputType,
    pub format: Vec<String>,
    pub no_header: bool,
    pub template: Option<String>,
}

impl RenderOptions {
    /// Read the output settings.
    pub fn from_settings(effective: &Effective) -> Result<Self, RenderError> {
        let output = effective
            .string(settings::OUTPUT)
            .unwrap_or_default()
            .parse()?;
        Ok(Self {
            output,
            format: effective.list(settings::FORMAT),
            no_header: effective.flag(settings::NO_HEADER),
            template: effective
                .string(settings::TEMPLATE)
                .filter(|t| !t.is_empty()),
        })
    }
}

/// Render a list of records.
pub fn render<T: Tabular>(
    out: &mut dyn Write,
    items: &[T],
    opts: &RenderOptions,
) -> Result<(), RenderError> {
    if let Some(source) = &opts.template {
        return render_template(out, items, source);
    }
    if opts.output == OutputType::Json {
        return render_json(out, items);
    }

    let columns = select_columns::<T>(&opts.format)?;
    let headers: Vec<String> = columns.iter().map(|c| c.header.to_string()).collect();
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| columns.iter().map(|c| (c.project)(item)).collect())
        .collect();
    write_table(out, (!opts.no_header).then_some(headers.as_slice()), &rows)
}

/// Render a single record.
pub fn render_one<T: Tabular>(
    out: &mut dyn Write,
    item: &T,
    opts: &RenderOptions,
) -> Result<(), RenderError> {
    render(out, std::slice::from_ref(item), opts)
}

/// Write a `Notice: <message>` line.
pub fn notice(out: &mut dyn Write, message: &str) -> io::Result<()> {
    writeln!(out, "Notice: {}", message)
}

fn render_template<T: Serialize>(
    out: &mut dyn Write,
    items: &[T],
    source: &str,
) -> Result<(), RenderError> {
    let template = Template::parse(source)?;
    for item in items {
        let value =
            serde_json::to_value(item).map_err(|e| RenderError::Serialize(e.to_string()))?;
        let text = template.render(&value)?;
        out.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn render_json<T: Serialize>(out: &mut dyn Write, items: &[T]) -> Result<(), RenderError> {
    let text =
        serde_json::to_string_pretty(items).map_err(|e| RenderError::Serialize(e.to_string()))?;
    writeln!(out, "{}", text)?;
    Ok(())
}

fn select_columns<T: Tabular>(format: &[String]) -> Result<Vec<Column<T>>, RenderError> {
    let all = T::columns();
    if format.is_empty() {
        return Ok(all);
    }
    let available: Vec<String> = all.iter().map(|c| c.key.to_string()).collect();
    let mut picked = Vec::with_capacity(format.len());
    for name in format {
        let found = all
            .iter()
            .position(|c| c.key.eq_ignore_ascii_case(name.trim()));
        match found {
            Some(i) => picked.push(all[i]),
            None => {
                return Err(RenderError::UnknownColumn {
                    name: name.clone(),
                    available,
                })
            }
        }
    }
    Ok(picked)
}

/// Write left-aligned columns separated by at least [`COLUMN_GAP`] spaces.
///
/// The table has no borders; trailing padding is trimmed from every line.
pub fn write_table(
    out: &mut dyn Write,
    headers: Option<&[String]>,
    rows: &[Vec<String>],
) -> Result<(), RenderError> {
    if headers.is_none() && rows.is_empty() {
        return Ok(());
    }
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_content_arrangement(ContentArrangement::Disabled);
    if let Some(headers) = headers {
        table.set_header(headers.iter().map(Cell::new));
    }
    for row in rows {
        table.add_row(row.iter().map(Cell::new));
    }
    for column in table.column_iter_mut() {
        column
            .set_padding((0, COLUMN_GAP))
            .set_cell_alignment(CellAlignment::Left);
    }

    for line in table.lines() {
        writeln!(out, "{}", line.trim_end())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Droplet {
        id: u64,
        name: String,
        region: String,
    }

    impl Tabular for Droplet {
        fn columns() -> Vec<Column<Self>> {
            vec![
                Column::new("ID", "ID", |d| d.id.to_string()),
                Column::new("Name", "Name", |d| d.name.clone()),
                Column::new("Region", "Region", |d| d.region.clone()),
            ]
        }
    }

    fn droplets() -> Vec<Droplet> {
        vec![
            Droplet {
                id: 1,
                name: "web-1".into(),
                region: "nyc3".into(),
            },
            Droplet {
                id: 22,
                name: "db".into(),
                region: "sfo2".into(),
            },
        ]
    }

    fn rendered(opts: &RenderOptions) -> String {
        let mut buf = Vec::new();
        render(&mut buf, &droplets(), opts).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn all_columns_by_default() {
        let text = rendered(&RenderOptions::default());
        assert_eq!(
            text,
            "ID    Name     Region\n1     web-1    nyc3\n22    db       sfo2\n"
        );
    }

    #[test]
    fn format_selects_and_orders_columns() {
        let opts = RenderOptions {
            format: vec!["region".into(), "ID".into()],
            ..Default::default()
        };
        assert_eq!(rendered(&opts), "Region    ID\nnyc3      1\nsfo2      22\n");
    }

    #[test]
    fn no_header_drops_first_line() {
        let opts = RenderOptions {
            no_header: true,
            format: vec!["Name".into()],
            ..Default::default()
        };
        assert_eq!(rendered(&opts), "web-1\ndb\n");
    }

    #[test]
    fn header_only_when_there_are_no_rows() {
        let mut buf = Vec::new();
        render::<Droplet>(&mut buf, &[], &RenderOptions::default()).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "ID    Name    Region\n");

        let mut buf = Vec::new();
        write_table(&mut buf, None, &[]).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn gap_follows_the_widest_cell() {
        let mut buf = Vec::new();
        let rows = vec![
            vec!["a".to_string(), "".to_string(), "z".to_string()],
            vec!["longer".to_string(), "b".to_string(), "".to_string()],
        ];
        write_table(&mut buf, None, &rows).unwrap();
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "a              z\nlonger    b\n"
        );
    }

    #[test]
    fn unknown_column_is_an_error() {
        let opts = RenderOptions {
            format: vec!["Size".into()],
            ..Default::default()
        };
        let mut buf = Vec::new();
        let err = render(&mut buf, &droplets(), &opts).unwrap_err();
        assert!(matches!(err, RenderError::UnknownColumn { .. }));
        assert!(err.to_string().contains("ID, Name, Region"));
    }

    #[test]
    fn template_runs_per_record() {
        let opts = RenderOptions {
            template: Some("{{.Name}} in {{.region}}".into()),
            ..Default::default()
        };
        assert_eq!(rendered(&opts), "web-1 in nyc3\ndb in sfo2\n");
    }

    #[test]
    fn template_wins_over_json() {
        let opts = RenderOptions {
            output: OutputType::Json,
            template: Some("{{.id}}".into()),
            ..Default::default()
        };
        assert_eq!(rendered(&opts), "1\n22\n");
    }

    #[test]
    fn json_output_is_an_array() {
        let opts = RenderOptions {
            output: OutputType::Json,
            ..Default::default()
        };
        let value: serde_json::Value = serde_json::from_str(&rendered(&opts)).unwrap();
        assert_eq!(value[1]["name"], "db");
    }

    #[test]
    fn output_type_parsing() {
        assert_eq!("JSON".parse::<OutputType>().unwrap(), OutputType::Json);
        assert!("yaml".parse::<OutputType>().is_err());
    }

    #[test]
    fn notice_line() {
        let mut buf = Vec::new();
        notice(&mut buf, "App deleted").unwrap();
        assert_eq!(buf, b"Notice: App deleted\n");
    }
}
