//! Application state for the LocalPDF API

use localpdf_core::Toolbox;

/// Shared by every handler; cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    pub toolbox: Toolbox,
}

impl AppState {
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }
}
