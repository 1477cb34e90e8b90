//! The format pass: flows content elements through page areas and records
//! where every fragment lands. Painting reads those records back.

pub mod area;
pub mod context;
pub mod document;
pub mod info;
pub mod page_break;
pub mod paragraph;
pub mod renderer;
pub mod shape;
pub mod table;
pub mod top_down;

#[cfg(test)]
pub(crate) mod testing;

pub use area::{Rectangle, TOLERANCE};
pub use context::FormattingContext;
pub use document::{FormattedDocument, FormattedPage, PagePosition};
pub use info::{BookmarkMap, FieldInfos, FormatInfo, LayoutInfo, PageInfo, PageNumber, RenderInfo};
pub use renderer::{PaintContext, Renderer, paint};
pub use top_down::{AreaProvider, SingleAreaProvider, TopDownFormatter};
