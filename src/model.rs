//! Read-only content tree consumed by the layout engine.
//!
//! Every value here is already resolved; the engine never cascades styles.
//! The types deserialize from JSON so documents can be fed to the CLI and to
//! tests without a separate authoring layer.

use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GRAY: Color = Color::rgb(128, 128, 128);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn components(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Font {
    pub name: String,
    pub size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Color,
    pub superscript: bool,
    pub subscript: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            name: "Helvetica".into(),
            size: 10.0,
            bold: false,
            italic: false,
            underline: false,
            color: Color::BLACK,
            superscript: false,
            subscript: false,
        }
    }
}

impl Font {
    /// Size actually used for glyphs; super/subscript shrink the run.
    pub fn effective_size(&self) -> f32 {
        if self.superscript || self.subscript {
            self.size * 0.58
        } else {
            self.size
        }
    }

    /// Vertical shift of the baseline in page coordinates (negative is up).
    pub fn baseline_shift(&self) -> f32 {
        if self.superscript {
            -self.size * 0.35
        } else if self.subscript {
            self.size * 0.14
        } else {
            0.0
        }
    }

    pub fn apply(&self, over: &FontOverride) -> Font {
        Font {
            name: over.name.clone().unwrap_or_else(|| self.name.clone()),
            size: over.size.unwrap_or(self.size),
            bold: over.bold.unwrap_or(self.bold),
            italic: over.italic.unwrap_or(self.italic),
            underline: over.underline.unwrap_or(self.underline),
            color: over.color.unwrap_or(self.color),
            superscript: over.superscript.unwrap_or(self.superscript),
            subscript: over.subscript.unwrap_or(self.subscript),
        }
    }
}

/// Partial font settings carried by a formatted span.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FontOverride {
    pub name: Option<String>,
    pub size: Option<f32>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub color: Option<Color>,
    pub superscript: Option<bool>,
    pub subscript: Option<bool>,
}

// ---------------------------------------------------------------------------
// Document and sections
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct DocumentInfo {
    pub title: String,
    pub author: String,
    pub subject: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Document {
    pub info: DocumentInfo,
    pub sections: Vec<Section>,
    /// Increment for default tab stops, in points.
    pub default_tab_stop: f32,
}

impl Default for Document {
    fn default() -> Self {
        Self {
            info: DocumentInfo::default(),
            sections: Vec::new(),
            default_tab_stop: 36.0,
        }
    }
}

impl Document {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Section {
    pub page_setup: PageSetup,
    pub headers: HeadersFooters,
    pub footers: HeadersFooters,
    pub elements: Vec<Block>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionStart {
    #[default]
    NextPage,
    OddPage,
    EvenPage,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PageSetup {
    /// Portrait width; landscape pages swap width and height.
    pub page_width: f32,
    pub page_height: f32,
    pub orientation: Orientation,
    pub top_margin: f32,
    pub bottom_margin: f32,
    pub left_margin: f32,
    pub right_margin: f32,
    /// Swap left/right margins on even physical pages.
    pub mirror_margins: bool,
    pub header_distance: f32,
    pub footer_distance: f32,
    pub section_start: SectionStart,
    pub different_first_page_header_footer: bool,
    pub odd_and_even_pages_header_footer: bool,
    pub starting_number: Option<u32>,
}

impl Default for PageSetup {
    fn default() -> Self {
        // A4 with 2.5 cm margins
        Self {
            page_width: 595.28,
            page_height: 841.89,
            orientation: Orientation::Portrait,
            top_margin: 70.87,
            bottom_margin: 70.87,
            left_margin: 70.87,
            right_margin: 70.87,
            mirror_margins: false,
            header_distance: 35.43,
            footer_distance: 35.43,
            section_start: SectionStart::NextPage,
            different_first_page_header_footer: false,
            odd_and_even_pages_header_footer: false,
            starting_number: None,
        }
    }
}

impl PageSetup {
    /// Page width and height after applying the orientation.
    pub fn effective_size(&self) -> (f32, f32) {
        match self.orientation {
            Orientation::Portrait => (self.page_width, self.page_height),
            Orientation::Landscape => (self.page_height, self.page_width),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeadersFooters {
    pub primary: Option<HeaderFooter>,
    pub first_page: Option<HeaderFooter>,
    pub even_page: Option<HeaderFooter>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct HeaderFooter {
    pub elements: Vec<Block>,
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph(Paragraph),
    Table(Table),
    Image(Image),
    TextFrame(TextFrame),
    Chart(Chart),
    PageBreak,
}

impl Block {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Paragraph(_) => "paragraph",
            Block::Table(_) => "table",
            Block::Image(_) => "image",
            Block::TextFrame(_) => "text_frame",
            Block::Chart(_) => "chart",
            Block::PageBreak => "page_break",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParagraphAlignment {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineSpacingRule {
    #[default]
    Single,
    OnePtFive,
    Double,
    Multiple(f32),
    AtLeast(f32),
    Exactly(f32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabAlignment {
    #[default]
    Left,
    Center,
    Right,
    Decimal,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabLeader {
    #[default]
    Spaces,
    Dots,
    Dashes,
    Lines,
    Heavy,
    MiddleDot,
}

impl TabLeader {
    pub fn fill_char(self) -> Option<char> {
        match self {
            TabLeader::Spaces => None,
            TabLeader::Dots => Some('.'),
            TabLeader::Dashes => Some('-'),
            TabLeader::Lines | TabLeader::Heavy => Some('_'),
            TabLeader::MiddleDot => Some('\u{00B7}'),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
pub struct TabStop {
    /// Offset from the left edge of the paragraph's area.
    pub position: f32,
    #[serde(default)]
    pub alignment: TabAlignment,
    #[serde(default)]
    pub leader: TabLeader,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    BulletList1,
    BulletList2,
    BulletList3,
    NumberList1,
    NumberList2,
    NumberList3,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberFormat {
    #[default]
    Arabic,
    RomanLower,
    RomanUpper,
    AlphaLower,
    AlphaUpper,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ListInfo {
    pub list_type: ListType,
    /// Offset of the list symbol relative to the first-line start.
    #[serde(default)]
    pub number_position: f32,
    #[serde(default = "default_true")]
    pub continue_previous_list: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    Single,
    Dot,
    DashSmallGap,
    DashLargeGap,
    DashDot,
}

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Border {
    pub visible: bool,
    pub width: f32,
    pub style: BorderStyle,
    pub color: Color,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            visible: true,
            width: 0.5,
            style: BorderStyle::Single,
            color: Color::BLACK,
        }
    }
}

impl Border {
    /// Width the border occupies in the layout; invisible borders take none.
    pub fn effective_width(border: Option<&Border>) -> f32 {
        border.filter(|b| b.visible).map_or(0.0, |b| b.width)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Borders {
    pub top: Option<Border>,
    pub bottom: Option<Border>,
    pub left: Option<Border>,
    pub right: Option<Border>,
    pub distance_from_top: f32,
    pub distance_from_bottom: f32,
    pub distance_from_left: f32,
    pub distance_from_right: f32,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ParagraphFormat {
    pub alignment: ParagraphAlignment,
    pub left_indent: f32,
    pub right_indent: f32,
    pub first_line_indent: f32,
    pub space_before: f32,
    pub space_after: f32,
    pub line_spacing: LineSpacingRule,
    pub tab_stops: Vec<TabStop>,
    pub list_info: Option<ListInfo>,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub page_break_before: bool,
    pub widow_control: bool,
    pub font: Font,
    pub borders: Borders,
    pub shading: Option<Color>,
}

impl Default for ParagraphFormat {
    fn default() -> Self {
        Self {
            alignment: ParagraphAlignment::Left,
            left_indent: 0.0,
            right_indent: 0.0,
            first_line_indent: 0.0,
            space_before: 0.0,
            space_after: 0.0,
            line_spacing: LineSpacingRule::Single,
            tab_stops: Vec::new(),
            list_info: None,
            keep_together: false,
            keep_with_next: false,
            page_break_before: false,
            widow_control: true,
            font: Font::default(),
            borders: Borders::default(),
            shading: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Paragraph {
    pub format: ParagraphFormat,
    pub content: Vec<Inline>,
}

impl Paragraph {
    pub fn with_text(text: &str) -> Self {
        Self {
            format: ParagraphFormat::default(),
            content: vec![Inline::Text { text: text.into() }],
        }
    }
}

// ---------------------------------------------------------------------------
// Inline content
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoField {
    #[default]
    Title,
    Author,
    Subject,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Page {
        #[serde(default)]
        format: NumberFormat,
    },
    NumPages {
        #[serde(default)]
        format: NumberFormat,
    },
    SectionNumber {
        #[serde(default)]
        format: NumberFormat,
    },
    SectionPages {
        #[serde(default)]
        format: NumberFormat,
    },
    Date {
        #[serde(default = "default_date_format")]
        format: String,
    },
    PageRef {
        name: String,
        #[serde(default)]
        format: NumberFormat,
    },
    Info {
        #[serde(default)]
        info: InfoField,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HyperlinkKind {
    #[default]
    Url,
    Bookmark,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text {
        text: String,
    },
    Tab,
    LineBreak,
    SoftHyphen,
    Symbol {
        symbol: char,
        #[serde(default = "default_one")]
        count: u32,
    },
    Field(FieldKind),
    Image(Image),
    Bookmark {
        name: String,
    },
    Formatted {
        #[serde(default)]
        font: FontOverride,
        #[serde(default)]
        content: Vec<Inline>,
    },
    Hyperlink {
        /// Mandatory; a hyperlink without a target is a configuration error.
        #[serde(default)]
        target: Option<String>,
        #[serde(default)]
        kind: HyperlinkKind,
        #[serde(default)]
        content: Vec<Inline>,
    },
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowHeightRule {
    #[default]
    Auto,
    AtLeast,
    Exactly,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowAlignment {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundedCorner {
    #[default]
    None,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub borders: Borders,
    pub shading: Option<Color>,
    pub top_padding: f32,
    pub bottom_padding: f32,
    pub left_padding: f32,
    pub right_padding: f32,
    pub rows_left_indent: f32,
    pub rows_alignment: RowAlignment,
    pub keep_together: bool,
    pub keep_with_next: bool,
    pub space_before: f32,
    pub space_after: f32,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            borders: Borders::default(),
            shading: None,
            top_padding: 0.0,
            bottom_padding: 0.0,
            left_padding: 3.4,
            right_padding: 3.4,
            rows_left_indent: 0.0,
            rows_alignment: RowAlignment::Left,
            keep_together: false,
            keep_with_next: false,
            space_before: 0.0,
            space_after: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Column {
    pub width: f32,
    pub left_padding: Option<f32>,
    pub right_padding: Option<f32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Row {
    pub height: f32,
    pub height_rule: RowHeightRule,
    /// Repeat this row at the top of every page the table spans.
    pub heading_format: bool,
    /// Number of following rows that must stay on the same page.
    pub keep_with: u32,
    pub vertical_alignment: VerticalAlignment,
    pub top_padding: Option<f32>,
    pub bottom_padding: Option<f32>,
    pub borders: Option<Borders>,
    pub shading: Option<Color>,
    pub cells: Vec<Cell>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Cell {
    pub merge_right: u32,
    pub merge_down: u32,
    pub elements: Vec<Block>,
    pub borders: Option<Borders>,
    pub shading: Option<Color>,
    pub vertical_alignment: Option<VerticalAlignment>,
    pub rounded_corner: RoundedCorner,
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeHorizontal {
    /// The area the shape flows in.
    #[default]
    Area,
    Margin,
    Page,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeVertical {
    /// Below the previous element.
    #[default]
    Area,
    Margin,
    Page,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeftPosition {
    #[default]
    Left,
    Center,
    Right,
    Inside,
    Outside,
    Offset(f32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopPosition {
    #[default]
    Top,
    Center,
    Bottom,
    Offset(f32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapStyle {
    /// Takes vertical space in the flow.
    #[default]
    TopBottom,
    /// Floats over the flow without displacing it.
    None,
    Through,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShapeLayout {
    pub relative_horizontal: RelativeHorizontal,
    pub relative_vertical: RelativeVertical,
    pub left: LeftPosition,
    pub top: TopPosition,
    pub wrap: WrapStyle,
    pub space_before: f32,
    pub space_after: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashStyle {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LineFormat {
    pub width: f32,
    pub color: Color,
    pub dash: DashStyle,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            width: 0.75,
            color: Color::BLACK,
            dash: DashStyle::Solid,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Image {
    pub source: String,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default = "default_scale")]
    pub scale_width: f32,
    #[serde(default = "default_scale")]
    pub scale_height: f32,
    #[serde(default = "default_true")]
    pub lock_aspect_ratio: bool,
    /// Overrides the resolution stored in the image file, in dpi.
    #[serde(default)]
    pub resolution: Option<f32>,
    #[serde(default)]
    pub layout: ShapeLayout,
    #[serde(default)]
    pub line: Option<LineFormat>,
}

impl Image {
    pub fn from_source(source: &str) -> Self {
        Self {
            source: source.into(),
            width: None,
            height: None,
            scale_width: 1.0,
            scale_height: 1.0,
            lock_aspect_ratio: true,
            resolution: None,
            layout: ShapeLayout::default(),
            line: None,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextFrame {
    pub width: f32,
    pub height: f32,
    pub elements: Vec<Block>,
    pub layout: ShapeLayout,
    pub line: Option<LineFormat>,
    pub fill: Option<Color>,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Column,
    Bar,
    Line,
    Pie,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Series {
    pub name: String,
    pub values: Vec<f64>,
    pub color: Option<Color>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Chart {
    pub kind: ChartKind,
    pub width: f32,
    pub height: f32,
    pub title: Option<String>,
    pub series: Vec<Series>,
    pub layout: ShapeLayout,
    pub line: Option<LineFormat>,
    pub fill: Option<Color>,
}

fn default_true() -> bool {
    true
}

fn default_one() -> u32 {
    1
}

fn default_scale() -> f32 {
    1.0
}

fn default_date_format() -> String {
    "%d.%m.%Y".into()
}
