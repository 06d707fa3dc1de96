use egui::Color32;

use crate::app::{MaskUpApp, Notice};
use crate::export::split_repo_name;

pub fn export_panel(app: &mut MaskUpApp, ctx: &egui::Context) {
    egui::SidePanel::right("export_panel")
        .resizable(true)
        .default_width(260.0)
        .show(ctx, |ui| {
            let total = app.store.len();
            let annotated = app.store.annotated_count();

            ui.label("Progress:");
            let fraction = if total == 0 { 0.0 } else { annotated as f32 / total as f32 };
            ui.add(egui::ProgressBar::new(fraction));
            ui.small(format!("{} of {} images annotated", annotated, total));

            ui.separator();
            ui.heading("Export Dataset");

            ui.strong("Download as ZIP");
            let archiving = app.is_exporting_archive();
            let label = if archiving { "Creating ZIP..." } else { "Download ZIP" };
            if ui
                .add_enabled(!archiving && total > 0, egui::Button::new(label))
                .on_hover_text(app.settings.archive_path().display().to_string())
                .clicked()
            {
                app.start_archive_export(ctx);
            }

            ui.separator();
            ui.strong("Upload to Hugging Face");
            ui.add(
                egui::TextEdit::singleline(&mut app.hub_token)
                    .password(true)
                    .hint_text("Hugging Face access token"),
            );
            ui.add(
                egui::TextEdit::singleline(&mut app.settings.dataset_name)
                    .hint_text("Dataset name (owner/name)"),
            );

            if let Some(task) = &app.publish_task {
                let progress = task.progress();
                ui.horizontal(|ui| {
                    ui.label("Upload Progress");
                    ui.label(format!("{} / {}", progress.current, progress.total));
                });
                ui.add(egui::ProgressBar::new(progress.fraction()).animate(true));
            }

            let publishing = app.is_publishing();
            let ready = !app.hub_token.trim().is_empty() && split_repo_name(app.settings.dataset_name.trim()).is_some();
            let label = if publishing { "Uploading..." } else { "Upload to HF" };
            if ui
                .add_enabled(!publishing && !archiving && ready && total > 0, egui::Button::new(label))
                .clicked()
            {
                app.start_publish(ctx);
            }

            ui.separator();
            if ui.button("Start New Project").clicked() {
                app.reset_project();
            }

            if let Some(notice) = &app.notice {
                ui.separator();
                let (color, text) = match notice {
                    Notice::Success(text) => (Color32::from_rgb(40, 150, 60), text),
                    Notice::Error(text) => (Color32::from_rgb(200, 50, 50), text),
                };
                ui.colored_label(color, text.as_str());
                if ui.small_button("Dismiss").clicked() {
                    app.notice = None;
                }
            }
        });
}
