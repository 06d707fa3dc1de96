use egui::{Color32, Pos2, Rect, Sense, Vec2};

use crate::app::{MaskUpApp, Notice};
use crate::paint::PaintError;

pub fn canvas_panel(app: &mut MaskUpApp, ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(image) = app.current_image().cloned() else {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("Create ML Datasets with Mask Annotations");
                ui.label("Drop images here to start. Draw masks, add prompts, then export a ZIP or publish to the Hugging Face Hub.");
            });
            return;
        };
        let count = app.store.len();
        let index = app.current_index;
        let busy = app.is_captioning();

        ui.horizontal(|ui| {
            ui.heading(format!("Image {} of {}: {}", index + 1, count, image.name()));
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add_enabled(index + 1 < count && !busy, egui::Button::new("Next")).clicked() {
                    app.go_to(index + 1);
                }
                if ui.add_enabled(index > 0 && !busy, egui::Button::new("Previous")).clicked() {
                    app.go_to(index.saturating_sub(1));
                }
            });
        });
        // Navigation above may have switched images.
        let Some(image) = app.current_image().cloned() else {
            return;
        };

        ui.horizontal(|ui| {
            ui.label("Brush Size:");
            let mut size = app.engine.brush().size();
            let range = app.engine.brush().range();
            if ui.add(egui::Slider::new(&mut size, range).suffix("px")).changed() {
                app.engine.set_brush_size(size);
            }
            if ui.button("Clear Mask").clicked() {
                if let Err(err) = app.engine.clear(&mut app.store) {
                    app.report(Notice::Error(err.to_string()));
                }
            }
        });

        ui.horizontal(|ui| {
            ui.label("Prompt/Caption (optional):");
            let mut prompt = app.store.prompt(image.id()).to_owned();
            let edit = egui::TextEdit::singleline(&mut prompt)
                .hint_text("Describe what you're masking...")
                .desired_width(ui.available_width() - 110.0);
            if ui.add(edit).changed() {
                app.store.set_prompt(image.id(), prompt);
            }
            let label = if busy { "Generating..." } else { "Caption" };
            let can_caption = !busy && !app.caption_key.is_empty();
            let button = ui
                .add_enabled(can_caption, egui::Button::new(label))
                .on_disabled_hover_text("Set MOONDREAM_API_KEY to enable captioning");
            if button.clicked() {
                app.start_caption(ctx);
            }
        });

        ui.separator();

        let Some(texture) = app.sync_texture(ctx) else {
            return;
        };
        let display = fit_size(
            Vec2::new(image.width() as f32, image.height() as f32),
            ui.available_size() - Vec2::new(0.0, 24.0),
        );
        let (response, painter) = ui.allocate_painter(display, Sense::click_and_drag());
        app.engine.set_display_rect(response.rect);
        painter.image(
            texture,
            response.rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
        painter.rect_stroke(response.rect, 0.0, egui::Stroke::new(1.0, Color32::from_gray(160)));

        if let Err(err) = handle_pointer(app, ui, &response) {
            log::warn!("Paint input dropped: {}", err);
        }

        ui.small("Draw on the image to edit the mask. The overlay shows your current mask.");
    });
}

/// Route pointer input over the canvas into the paint engine
fn handle_pointer(app: &mut MaskUpApp, ui: &egui::Ui, response: &egui::Response) -> Result<(), PaintError> {
    let (pressed, down, released, pos) = ui.input(|i| {
        (
            i.pointer.primary_pressed(),
            i.pointer.primary_down(),
            i.pointer.primary_released(),
            i.pointer.interact_pos(),
        )
    });
    let Some(pos) = pos else {
        return app.engine.end_stroke(&mut app.store);
    };
    let inside = response.rect.contains(pos);

    if pressed && inside && response.hovered() {
        app.engine.begin_stroke(&mut app.store, pos)?;
    } else if down && app.engine.is_painting() {
        if inside {
            app.engine.continue_stroke(&mut app.store, pos)?;
        } else {
            // Leaving the canvas ends the stroke.
            app.engine.end_stroke(&mut app.store)?;
        }
    }
    if released {
        app.engine.end_stroke(&mut app.store)?;
    }
    Ok(())
}

/// Largest size with the image's aspect ratio that fits `available`, never
/// upscaled
fn fit_size(image: Vec2, available: Vec2) -> Vec2 {
    if image.x <= 0.0 || image.y <= 0.0 {
        return Vec2::ZERO;
    }
    let scale = (available.x / image.x).min(available.y / image.y).clamp(0.05, 1.0);
    image * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn large_images_shrink_to_fit() {
        let fitted = fit_size(Vec2::new(800.0, 600.0), Vec2::new(400.0, 1000.0));
        assert_eq!(fitted, Vec2::new(400.0, 300.0));
    }

    #[test]
    fn small_images_are_shown_at_native_size() {
        let fitted = fit_size(Vec2::new(200.0, 100.0), Vec2::new(1000.0, 1000.0));
        assert_eq!(fitted, Vec2::new(200.0, 100.0));
    }
}
