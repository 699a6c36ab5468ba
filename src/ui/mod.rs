/// Rendering: menu and control panels, and the plot panel grids.
pub mod panels;
pub mod plot;
