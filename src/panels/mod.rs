mod central_panel;
mod export_panel;

pub use central_panel::canvas_panel;
pub use export_panel::export_panel;
