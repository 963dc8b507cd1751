use std::path::Path;
use std::sync::Arc;

use eframe::egui::{self, Align, ColorImage, Context, Layout};

use crate::util::ellipsize;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(
        &mut self,
        ctx: &Context,
        snapshot_path: &Path,
        reload_requested: &mut bool,
        is_loading: bool,
    ) {
        if self.screenshot_requested {
            ctx.send_viewport_cmd(egui::ViewportCommand::Screenshot(egui::UserData::default()));
            self.screenshot_requested = false;
        }
        let screenshot = ctx.input(|input| {
            input.events.iter().find_map(|event| match event {
                egui::Event::Screenshot { image, .. } => Some(Arc::clone(image)),
                _ => None,
            })
        });
        if let Some(image) = screenshot {
            self.save_screenshot(ctx, &image);
        }

        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading("entilens");
                    ui.separator();
                    if let Some(source) = &self.snapshot.metadata.source {
                        ui.label(format!("source: {source}"));
                    }
                    ui.label(format!(
                        "snapshot: {}",
                        ellipsize(&snapshot_path.display().to_string(), 48)
                    ));
                    ui.label(format!("entities: {}", self.snapshot.entity_count()));
                    ui.label(format!(
                        "relationships: {}",
                        self.snapshot.relationship_count()
                    ));
                    let reload_button =
                        ui.add_enabled(!is_loading, egui::Button::new("Reload snapshot"));
                    if reload_button.clicked() {
                        *reload_requested = true;
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if self.layout_job.is_some() {
                            ui.spinner();
                            ui.label("re-layout");
                        }
                        ui.label(format!(
                            "rendered: {} nodes / {} edges",
                            self.graph.nodes.len(),
                            self.graph.edges.len()
                        ));
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(300.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("details")
            .resizable(true)
            .default_width(340.0)
            .show(ctx, |ui| self.draw_details(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            if is_loading {
                ui.vertical_centered(|ui| {
                    ui.add_space(120.0);
                    ui.heading("Reloading entity snapshot...");
                    ui.add_space(8.0);
                    ui.spinner();
                });
            } else {
                self.draw_graph(ui);
            }
        });
    }

    fn save_screenshot(&mut self, ctx: &Context, image: &ColorImage) {
        let rgba: Vec<u8> = image
            .pixels
            .iter()
            .flat_map(|pixel| pixel.to_array())
            .collect();
        match crate::export::encode_screenshot(&rgba, image.size[0] as u32, image.size[1] as u32) {
            Ok((png, data_uri)) => {
                let path = output_path("entilens", "png");
                match std::fs::write(&path, &png) {
                    Ok(()) => {
                        ctx.copy_text(data_uri);
                        self.status =
                            Some(format!("saved {} (data URI copied)", path.display()));
                    }
                    Err(e) => {
                        log::warn!("failed to write screenshot {}: {e}", path.display());
                        self.status = Some(format!("screenshot failed: {e}"));
                    }
                }
            }
            Err(e) => {
                log::warn!("screenshot encode failed: {e:#}");
                self.status = Some(format!("screenshot failed: {e:#}"));
            }
        }
    }
}

pub(in crate::app) fn output_path(stem: &str, extension: &str) -> std::path::PathBuf {
    let seconds = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    std::path::PathBuf::from(format!("{stem}-{seconds}.{extension}"))
}
