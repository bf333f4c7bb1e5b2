//! In-memory document model
//!
//! Just enough of WordprocessingML to express Russian business documents:
//! paragraphs with point-based indents and spacing, runs with
//! bold/italic/underline, tab stops and simple bordered tables.
//! All measurements are in points; the writer converts to twips.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
    /// Justified
    Both,
}

impl Alignment {
    pub fn as_ooxml(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Both => "both",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabAlignment {
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TabStop {
    pub position_pt: f32,
    pub alignment: TabAlignment,
}

/// A run of uniformly formatted text. `\t` and `\n` inside the text are
/// written as tabs and line breaks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub font: Option<String>,
    pub size_pt: Option<f32>,
}

impl Run {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn underline(mut self) -> Self {
        self.underline = true;
        self
    }

    /// Underline only when `on`; lets style flags flow through builders
    pub fn underline_if(mut self, on: bool) -> Self {
        self.underline = on;
        self
    }

    pub fn size(mut self, size_pt: f32) -> Self {
        self.size_pt = Some(size_pt);
        self
    }

    pub fn font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<Run>,
    pub alignment: Alignment,
    pub first_line_indent_pt: f32,
    pub left_indent_pt: f32,
    pub spacing_before_pt: f32,
    pub spacing_after_pt: f32,
    /// Line spacing multiplier (1.0 = single)
    pub line_spacing: f32,
    pub keep_with_next: bool,
    pub tab_stops: Vec<TabStop>,
}

impl Default for Paragraph {
    fn default() -> Self {
        Self {
            runs: Vec::new(),
            alignment: Alignment::Left,
            first_line_indent_pt: 0.0,
            left_indent_pt: 0.0,
            spacing_before_pt: 0.0,
            spacing_after_pt: 0.0,
            line_spacing: 1.0,
            keep_with_next: false,
            tab_stops: Vec::new(),
        }
    }
}

impl Paragraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paragraph with a single plain run
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new().run(Run::text(text))
    }

    pub fn run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    pub fn align(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn first_line_indent(mut self, pt: f32) -> Self {
        self.first_line_indent_pt = pt;
        self
    }

    pub fn left_indent(mut self, pt: f32) -> Self {
        self.left_indent_pt = pt;
        self
    }

    pub fn spacing(mut self, before_pt: f32, after_pt: f32) -> Self {
        self.spacing_before_pt = before_pt;
        self.spacing_after_pt = after_pt;
        self
    }

    pub fn line_spacing(mut self, multiplier: f32) -> Self {
        self.line_spacing = multiplier;
        self
    }

    pub fn keep_with_next(mut self) -> Self {
        self.keep_with_next = true;
        self
    }

    pub fn tab_stop(mut self, position_pt: f32, alignment: TabAlignment) -> Self {
        self.tab_stops.push(TabStop {
            position_pt,
            alignment,
        });
        self
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::plain(text)],
        }
    }

    pub fn paragraph(paragraph: Paragraph) -> Self {
        Self {
            paragraphs: vec![paragraph],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub column_widths_pt: Vec<f32>,
    pub rows: Vec<Vec<Cell>>,
    pub borders: bool,
    /// Leading rows repeated on each page
    pub header_rows: usize,
}

impl Table {
    pub fn new(column_widths_pt: Vec<f32>) -> Self {
        Self {
            column_widths_pt,
            rows: Vec::new(),
            borders: true,
            header_rows: 0,
        }
    }

    /// Borderless layout table (signature blocks)
    pub fn layout(column_widths_pt: Vec<f32>) -> Self {
        Self {
            borders: false,
            ..Self::new(column_widths_pt)
        }
    }

    /// Bold centered header row
    pub fn header<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        let row = labels
            .iter()
            .map(|label| {
                Cell::paragraph(
                    Paragraph::new()
                        .align(Alignment::Center)
                        .run(Run::text(label.as_ref()).bold()),
                )
            })
            .collect();
        self.rows.push(row);
        self.header_rows += 1;
        self
    }

    pub fn row(mut self, cells: Vec<Cell>) -> Self {
        self.rows.push(cells);
        self
    }

    pub fn text_row<S: AsRef<str>>(self, values: &[S]) -> Self {
        let cells = values.iter().map(|v| Cell::text(v.as_ref())).collect();
        self.row(cells)
    }

    pub fn column_count(&self) -> usize {
        self.rows
            .iter()
            .map(Vec::len)
            .max()
            .unwrap_or(0)
            .max(self.column_widths_pt.len())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
}

/// A4 page with margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSetup {
    pub width_mm: f32,
    pub height_mm: f32,
    pub margin_top_mm: f32,
    pub margin_bottom_mm: f32,
    pub margin_left_mm: f32,
    pub margin_right_mm: f32,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            width_mm: 210.0,
            height_mm: 297.0,
            margin_top_mm: 20.0,
            margin_bottom_mm: 20.0,
            margin_left_mm: 30.0,
            margin_right_mm: 15.0,
        }
    }
}

impl PageSetup {
    /// Usable text width in points
    pub fn text_width_pt(&self) -> f32 {
        mm_to_pt(self.width_mm - self.margin_left_mm - self.margin_right_mm)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub title: Option<String>,
    pub author: Option<String>,
    pub default_font: String,
    pub default_size_pt: f32,
    pub page: PageSetup,
    pub blocks: Vec<Block>,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            title: None,
            author: None,
            default_font: "Times New Roman".to_string(),
            default_size_pt: 12.0,
            page: PageSetup::default(),
            blocks: Vec::new(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn push_table(&mut self, table: Table) {
        self.blocks.push(Block::Table(table));
    }

    pub fn empty_line(&mut self) {
        self.push_paragraph(Paragraph::new());
    }

    pub fn paragraph_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Paragraph(_)))
            .count()
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Paragraph(_) => None,
        })
    }
}

pub fn mm_to_pt(mm: f32) -> f32 {
    mm * 72.0 / 25.4
}
