use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use super::ReportRenderer;
use crate::models::{Dataset, Parameter};
use crate::types::{AppError, AppResult};

const REPORT_TITLE: &str = "Chemical Equipment Analysis Report";
const SAMPLE_RECORDS: usize = 10;

// A4 in points
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN_LEFT: i64 = 50;
const FIRST_BASELINE: i64 = 792;
const LEADING: i64 = 14;
const LINES_PER_PAGE: usize = 48;

const TITLE_SIZE: i64 = 16;
const HEADING_SIZE: i64 = 12;
const BODY_SIZE: i64 = 9;

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Title(String),
    Heading(String),
    Text(String),
    Blank,
}

/// Single-font (Courier) PDF with uncompressed content streams
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfReportRenderer;

impl PdfReportRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl ReportRenderer for PdfReportRenderer {
    fn render(&self, dataset: &Dataset) -> AppResult<Vec<u8>> {
        let lines = layout(dataset);
        write_document(&lines)
    }

    fn content_type(&self) -> mime::Mime {
        mime::APPLICATION_PDF
    }

    fn file_name(&self, dataset: &Dataset) -> String {
        format!("equipment_report_{}.pdf", dataset.id)
    }
}

fn layout(dataset: &Dataset) -> Vec<Line> {
    let summary = &dataset.summary_stats;
    let mut lines = vec![
        Line::Title(REPORT_TITLE.to_string()),
        Line::Blank,
        Line::Text(format!("Dataset: {}", dataset.name)),
        Line::Text(format!(
            "Uploaded: {}",
            dataset.uploaded_at.format("%Y-%m-%d %H:%M UTC")
        )),
        Line::Text(format!("File: {}", dataset.file_name)),
        Line::Blank,
        Line::Heading("Summary Statistics".to_string()),
        Line::Text(format!("Total Equipment Count: {}", summary.total_count)),
    ];

    for parameter in Parameter::ALL {
        let Some(stats) = summary.parameter_stats.get(&parameter) else {
            continue;
        };
        lines.push(Line::Blank);
        lines.push(Line::Heading(format!("{} Statistics", parameter.label())));
        lines.push(Line::Text(format!("{:<12}{:>14.2}", "Mean", stats.mean)));
        lines.push(Line::Text(format!("{:<12}{:>14.2}", "Min", stats.min)));
        lines.push(Line::Text(format!("{:<12}{:>14.2}", "Max", stats.max)));
        lines.push(Line::Text(format!("{:<12}{:>14.2}", "Std Dev", stats.std)));
    }

    lines.push(Line::Blank);
    lines.push(Line::Heading("Equipment Type Distribution".to_string()));
    lines.push(Line::Text(format!("{:<16}{:>10}", "Equipment Type", "Count")));
    for (kind, count) in &summary.equipment_type_distribution {
        lines.push(Line::Text(format!("{:<16}{:>10}", kind.as_str(), count)));
    }

    let shown = dataset.equipments.len().min(SAMPLE_RECORDS);
    lines.push(Line::Blank);
    lines.push(Line::Heading(format!(
        "Sample Equipment Data (First {} Records)",
        shown
    )));
    lines.push(Line::Text(format!(
        "{:<20}{:<15}{:>10}{:>10}{:>13}",
        "Name", "Type", "Flowrate", "Pressure", "Temperature"
    )));
    for record in dataset.equipments.iter().take(SAMPLE_RECORDS) {
        lines.push(Line::Text(format!(
            "{:<20}{:<15}{:>10.1}{:>10.1}{:>13.1}",
            truncate(&record.equipment_name, 19),
            record.equipment_type.as_str(),
            record.flowrate,
            record.pressure,
            record.temperature
        )));
    }

    lines
}

fn truncate(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

fn page_operations(lines: &[Line]) -> Vec<Operation> {
    let mut ops = vec![
        Operation::new("BT", vec![]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new(
            "Td",
            vec![Object::Integer(MARGIN_LEFT), Object::Integer(FIRST_BASELINE)],
        ),
    ];

    for line in lines {
        let (size, text) = match line {
            Line::Title(text) => (TITLE_SIZE, text.as_str()),
            Line::Heading(text) => (HEADING_SIZE, text.as_str()),
            Line::Text(text) => (BODY_SIZE, text.as_str()),
            Line::Blank => (BODY_SIZE, ""),
        };
        ops.push(Operation::new(
            "Tf",
            vec![Object::Name(b"F1".to_vec()), Object::Integer(size)],
        ));
        if !text.is_empty() {
            ops.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(text))]));
        }
        ops.push(Operation::new("T*", vec![]));
    }

    ops.push(Operation::new("ET", vec![]));
    ops
}

/// Encode text for the standard Courier font under WinAnsiEncoding.
/// Characters the encoding cannot represent become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '\u{20ac}' => 0x80,
            '\u{2026}' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201c}' => 0x93,
            '\u{201d}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}

fn write_document(lines: &[Line]) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::new();
    for chunk in lines.chunks(LINES_PER_PAGE) {
        let content = Content {
            operations: page_operations(chunk),
        };
        let encoded = content
            .encode()
            .map_err(|e| AppError::Report(e.to_string()))?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => Object::Array(kids),
        "Count" => Object::Integer(page_count),
        "Resources" => resources_id,
        "MediaBox" => Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ]),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Report(e.to_string()))?;
    Ok(buffer)
}
