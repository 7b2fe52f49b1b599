//! Renders audit rows as spreadsheet-friendly CSV or as a JSON report.

use crate::audit::AuditReport;
use crate::matrix::{PolicyKind, PolicyRow};
use crate::schema::{CheckKey, Locale, CLASSIC_SCHEMA, RULESET_SCHEMA};
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::warn;

const UTF8_BOM: &str = "\u{feff}";
const RECORD_END: &str = "\r\n";

pub const CLASSIC_FILE: &str = "classic-protection-matrix.csv";
pub const RULESET_FILE: &str = "ruleset-matrix.csv";
pub const JSON_FILE: &str = "protection-audit.json";

#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    #[default]
    Csv,
    Json,
}

/// Orientation of the CSV output.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// One column per policy, one line per check.
    #[default]
    Columns,
    /// One line per policy, one column per check.
    Rows,
}

/// Character encoding of the CSV files. JSON is always UTF-8.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Encoding {
    #[default]
    Utf8,
    /// For spreadsheet tools that open CSV in the Japanese legacy code page.
    ShiftJis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matrix {
    Classic,
    RuleSet,
}

impl Matrix {
    pub fn schema(self) -> &'static [CheckKey] {
        match self {
            Matrix::Classic => CLASSIC_SCHEMA,
            Matrix::RuleSet => RULESET_SCHEMA,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub layout: Layout,
    pub locale: Locale,
    /// Only honoured for UTF-8 output.
    pub bom: bool,
    pub encoding: Encoding,
}

fn corner_label(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "Check",
        Locale::Ja => "保護項目",
    }
}

fn no_ruleset_label(locale: Locale) -> &'static str {
    match locale {
        Locale::En => "(no ruleset)",
        Locale::Ja => "(ルールセットなし)",
    }
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn push_record<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let record: Vec<String> = fields.into_iter().map(|f| escape(f.as_ref())).collect();
    out.push_str(&record.join(","));
    out.push_str(RECORD_END);
}

fn ruleset_name(row: &PolicyRow, locale: Locale) -> String {
    match (&row.key().ruleset, row.key().kind) {
        (Some(name), _) => name.clone(),
        (None, PolicyKind::NoRuleSet) => no_ruleset_label(locale).to_string(),
        (None, _) => String::new(),
    }
}

fn cell_text(row: &PolicyRow, key: CheckKey) -> &str {
    row.get(key).map_or("", |cell| cell.as_str())
}

/// Renders one matrix as CSV.
pub fn render_csv(matrix: Matrix, rows: &[PolicyRow], options: &RenderOptions) -> String {
    let mut out = String::new();
    if options.bom && options.encoding == Encoding::Utf8 {
        out.push_str(UTF8_BOM);
    }
    match options.layout {
        Layout::Columns => render_columns(&mut out, matrix, rows, options.locale),
        Layout::Rows => render_rows(&mut out, matrix, rows, options.locale),
    }
    out
}

fn render_columns(out: &mut String, matrix: Matrix, rows: &[PolicyRow], locale: Locale) {
    let corner = corner_label(locale);
    push_record(
        out,
        std::iter::once(corner.to_string()).chain(rows.iter().map(|r| r.key().repository.to_string())),
    );
    if matrix == Matrix::RuleSet {
        push_record(
            out,
            std::iter::once(String::new()).chain(rows.iter().map(|r| ruleset_name(r, locale))),
        );
    }
    push_record(
        out,
        std::iter::once(String::new()).chain(rows.iter().map(|r| r.key().branch.clone())),
    );

    for &key in matrix.schema() {
        push_record(
            out,
            std::iter::once(key.label(locale)).chain(rows.iter().map(|row| cell_text(row, key))),
        );
    }
}

fn render_rows(out: &mut String, matrix: Matrix, rows: &[PolicyRow], locale: Locale) {
    let header = ["repository", "kind", "ruleset", "branch"];
    push_record(
        out,
        header
            .into_iter()
            .chain(matrix.schema().iter().map(|key| key.label(locale))),
    );

    for row in rows {
        let key = row.key();
        let lead = [
            key.repository.to_string(),
            key.kind.to_string(),
            ruleset_name(row, locale),
            key.branch.clone(),
        ];
        let cells = matrix
            .schema()
            .iter()
            .map(|&column| cell_text(row, column).to_string());
        push_record(out, lead.into_iter().chain(cells));
    }
}

/// Encodes rendered CSV text.
///
/// Characters Shift-JIS cannot represent are written as numeric character
/// references and reported, so one exotic ruleset name does not lose the run.
pub fn encode_csv(text: &str, encoding: Encoding) -> Vec<u8> {
    match encoding {
        Encoding::Utf8 => text.as_bytes().to_vec(),
        Encoding::ShiftJis => {
            let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
            if had_errors {
                warn!("Some characters have no Shift-JIS form and were written as character references");
            }
            bytes.into_owned()
        }
    }
}

pub fn render_json(report: &AuditReport) -> anyhow::Result<String> {
    serde_json::to_string_pretty(report).context("Cannot serialize audit report")
}

/// Writes the report into `dir`, returning the files written.
pub fn write_report(
    report: &AuditReport,
    format: Format,
    options: &RenderOptions,
    dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Cannot create output directory {}", dir.display()))?;

    let outputs = match format {
        Format::Csv => vec![
            (
                dir.join(CLASSIC_FILE),
                encode_csv(
                    &render_csv(Matrix::Classic, &report.classic_rows, options),
                    options.encoding,
                ),
            ),
            (
                dir.join(RULESET_FILE),
                encode_csv(
                    &render_csv(Matrix::RuleSet, &report.ruleset_rows, options),
                    options.encoding,
                ),
            ),
        ],
        Format::Json => vec![(dir.join(JSON_FILE), render_json(report)?.into_bytes())],
    };

    let mut written = vec![];
    for (path, contents) in outputs {
        std::fs::write(&path, contents)
            .with_context(|| format!("Cannot write {}", path.display()))?;
        written.push(path);
    }
    Ok(written)
}
