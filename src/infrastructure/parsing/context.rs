//! Context for parsing a single chart page

use crate::domain::GridCell;

/// Which grid cell a chart page belongs to and where it came from
#[derive(Debug, Clone)]
pub struct ChartPageContext {
    pub cell: GridCell,
    pub url: String,
}

impl ChartPageContext {
    pub fn new(cell: GridCell, url: impl Into<String>) -> Self {
        Self {
            cell,
            url: url.into(),
        }
    }
}
