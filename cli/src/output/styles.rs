//! Terminal stylesheet. `Styles::default()` is plain text; `Styles::colored()`
//! is used when stdout is a colour-capable TTY.

use owo_colors::Style;

#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    /// Only used on stderr.
    pub error: Style,
    pub info: Style,
    /// Arrow in front of a lifecycle step when no spinner is shown.
    pub step: Style,
    pub dim: Style,
    pub bold: Style,
    pub header: Style,
}

impl Styles {
    #[must_use]
    pub fn colored() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red(),
            info: Style::new().blue(),
            step: Style::new().cyan(),
            dim: Style::new().dimmed(),
            bold: Style::new().bold(),
            header: Style::new().bold().cyan(),
        }
    }
}
