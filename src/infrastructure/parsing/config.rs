//! Selector configuration for the chart page

use serde::{Deserialize, Serialize};

/// CSS selectors used to locate measurement rows on a chart page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSelectors {
    /// The results table
    pub table: String,

    /// Data rows inside the results table
    pub row: String,

    /// Temperature values inside the last data cell
    pub temperature: String,
}

impl Default for ChartSelectors {
    fn default() -> Self {
        Self {
            table: r#"table[width="680"][bordercolorlight="black"]"#.to_string(),
            row: r#"tr[class="tdm"]"#.to_string(),
            temperature: "font".to_string(),
        }
    }
}
