use super::{ActionProgress, DocVaultApp, NoticeKind, Page};
use crate::api::filter_files;
use crate::upload::UploadStatus;
use crate::utils::format_size;
use chrono::Local;
use egui::{Align, Color32, RichText};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(37, 99, 235);
const SUCCESS: Color32 = Color32::from_rgb(0, 180, 0);
const FAILURE: Color32 = Color32::from_rgb(220, 50, 50);
const MUTED: Color32 = Color32::from_rgb(150, 150, 150);

impl DocVaultApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("navigation").show(ctx, |ui| {
            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label(RichText::new("DocVault").strong().color(ACCENT));
                ui.separator();
                let mut target = self.page;
                for page in Page::ALL {
                    ui.selectable_value(&mut target, page, page.title());
                }
                self.navigate(target);

                if let Some(identity) = self.remembered_identity.clone() {
                    ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                        if ui.button("Sign out").clicked() {
                            self.sign_out();
                        }
                        ui.label(format!("Signed in as {}", identity));
                    });
                }
            });
            ui.add_space(6.0);
        });

        egui::TopBottomPanel::bottom("notices").show(ctx, |ui| self.render_notices(ui));

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                match self.page {
                    Page::SignIn => self.render_sign_in(ui),
                    Page::SignUp => self.render_sign_up(ui),
                    Page::Upload => self.render_upload(ui),
                    Page::Share => self.render_share(ui),
                    Page::Files => self.render_files(ui),
                }
                ui.add_space(20.0);
            });
        });
    }

    fn render_sign_in(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Sign In");
            ui.add_space(15.0);
            ui.set_max_width(320.0);

            ui.add(egui::TextEdit::singleline(&mut self.sign_in.username).hint_text("Username"));
            ui.add_space(8.0);
            let password = ui.add(
                egui::TextEdit::singleline(&mut self.sign_in.password)
                    .password(true)
                    .hint_text("Password"),
            );
            let submitted = password.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(12.0);

            let label = if self.sign_in.in_flight() { "⏳ Signing in..." } else { "Sign In" };
            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 36.0));
            if ui.add_enabled(self.sign_in.can_submit(), button).clicked() || submitted {
                self.submit_sign_in();
            }
        });
    }

    fn render_sign_up(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Create Account");
            ui.add_space(15.0);
            ui.set_max_width(320.0);

            ui.add(egui::TextEdit::singleline(&mut self.sign_up.username).hint_text("Username"));
            ui.add_space(8.0);
            ui.add(
                egui::TextEdit::singleline(&mut self.sign_up.password)
                    .password(true)
                    .hint_text("Password"),
            );
            ui.add_space(12.0);

            let label = if self.sign_up.in_flight() { "⏳ Creating..." } else { "Sign Up" };
            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 36.0));
            if ui.add_enabled(self.sign_up.can_submit(), button).clicked() {
                self.submit_sign_up();
            }
        });
    }

    fn render_upload(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.heading("Upload Your Files");
        });
        ui.add_space(15.0);

        ui.add_enabled(
            !self.upload.is_uploading,
            egui::TextEdit::singleline(&mut self.upload.identity)
                .desired_width(f32::INFINITY)
                .hint_text("Enter your username"),
        );
        ui.add_space(12.0);

        let stroke_color = if self.upload.is_dragging { ACCENT } else { MUTED };
        let fill = if self.upload.is_dragging {
            ACCENT.linear_multiply(0.08)
        } else {
            Color32::TRANSPARENT
        };
        egui::Frame::none()
            .stroke(egui::Stroke::new(2.0, stroke_color))
            .fill(fill)
            .rounding(8.0)
            .inner_margin(24.0)
            .show(ui, |ui| {
                ui.set_width(ui.available_width());
                ui.vertical_centered(|ui| {
                    ui.label("📤 Drag and drop files here or");
                    ui.add_space(6.0);
                    ui.horizontal(|ui| {
                        ui.add_enabled_ui(!self.upload.is_uploading, |ui| {
                            if ui.button("📄 Select Files").clicked() {
                                if let Some(paths) = FileDialog::new().pick_files() {
                                    self.add_paths(paths);
                                }
                            }
                            if ui.button("📁 Add Folder").clicked() {
                                if let Some(folder) = FileDialog::new().pick_folder() {
                                    self.add_folder(folder);
                                }
                            }
                        });
                    });
                    ui.add_space(4.0);
                    ui.label(
                        RichText::new(format!(
                            "Allowed: {}",
                            self.coordinator.allow_list().describe()
                        ))
                        .small()
                        .color(MUTED),
                    );
                });
            });

        if !self.upload.selected.is_empty() {
            ui.add_space(12.0);
            ui.label(RichText::new("Files to upload:").strong());
            ui.add_space(4.0);

            let mut remove = None;
            for (index, file) in self.upload.selected.iter().enumerate() {
                ui.group(|ui| {
                    ui.horizontal(|ui| {
                        ui.label(&file.name);
                        ui.label(RichText::new(format_size(file.size())).color(MUTED));
                        ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                            let button = egui::Button::new(RichText::new("✖").color(FAILURE));
                            if ui.add_enabled(!self.upload.is_uploading, button).clicked() {
                                remove = Some(index);
                            }
                        });
                    });
                });
            }
            if let Some(index) = remove {
                self.upload.remove(index);
            }
        }

        ui.add_space(16.0);
        ui.vertical_centered(|ui| {
            let label = if self.upload.is_uploading { "⏳ Uploading..." } else { "Upload" };
            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 40.0));
            if ui.add_enabled(!self.upload.is_uploading, button).clicked() {
                self.start_upload();
            }
        });

        if !matches!(self.upload.progress, ActionProgress::NotStarted) {
            ui.add_space(16.0);
            ui.group(|ui| {
                if let Some(current_file) = &self.upload.current_file {
                    let status_text = match &self.upload.progress {
                        ActionProgress::Completed { failed, .. } if *failed > 0 => "Upload Finished With Failures",
                        ActionProgress::Completed { .. } => "Upload Complete",
                        _ => "📤 Uploading",
                    };
                    ui.label(format!("{}: {}", status_text, current_file));
                }

                let progress_bar = egui::ProgressBar::new(self.upload.get_progress_percentage())
                    .show_percentage()
                    .animate(self.upload.is_uploading)
                    .fill(ACCENT);
                ui.add(progress_bar);
                ui.label(self.upload.get_status_text());
            });

            if !self.upload.file_statuses.is_empty() {
                ui.add_space(10.0);
                self.render_details(ui);
            }
        }
    }

    fn render_details(&mut self, ui: &mut egui::Ui) {
        if ui
            .button(if self.upload.show_details {
                "Hide Details"
            } else {
                "Show Details"
            })
            .clicked()
        {
            self.upload.show_details = !self.upload.show_details;
        }

        if self.upload.show_details {
            egui::ScrollArea::vertical()
                .id_source("upload_details")
                .max_height(200.0)
                .show(ui, |ui| {
                    egui::Frame::none()
                        .fill(ui.style().visuals.extreme_bg_color)
                        .show(ui, |ui| {
                            ui.add_space(8.0);
                            for status in &self.upload.file_statuses {
                                let (icon, color, text) = match &status.status {
                                    UploadStatus::Processing => {
                                        ("⏳", MUTED, format!("{} - Processing...", status.name))
                                    }
                                    UploadStatus::Success => ("✅", SUCCESS, status.name.clone()),
                                    UploadStatus::Error(err) => {
                                        ("❌", FAILURE, format!("{} - {}", status.name, err))
                                    }
                                    UploadStatus::Skipped(reason) => {
                                        ("⏩", MUTED, format!("{} - {}", status.name, reason))
                                    }
                                };
                                ui.horizontal(|ui| {
                                    ui.label(icon);
                                    ui.colored_label(color, text);
                                });
                                ui.add_space(4.0);
                            }
                            ui.add_space(8.0);
                        });
                });
        }
    }

    fn render_share(&mut self, ui: &mut egui::Ui) {
        ui.heading("Share Documents");
        ui.add_space(15.0);

        ui.label(RichText::new("Select File").strong());
        ui.add(
            egui::TextEdit::singleline(&mut self.share.search)
                .desired_width(f32::INFINITY)
                .hint_text("🔍 Search files..."),
        );
        ui.add_space(8.0);

        if self.files.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading files...");
            });
        } else if let Some(error) = &self.files.error {
            ui.colored_label(FAILURE, error);
        } else {
            let matches = filter_files(&self.files.files, &self.share.search);
            if matches.is_empty() {
                ui.label(RichText::new("No matching files").color(MUTED));
            }
            egui::ScrollArea::vertical()
                .id_source("share_files")
                .max_height(240.0)
                .show(ui, |ui| {
                    for file in matches {
                        let checked = self.share.selected.as_deref() == Some(file.file_name.as_str());
                        let text = format!("{}  ·  {}", file.file_name, format_size(file.size));
                        if ui.radio(checked, text).clicked() {
                            self.share.selected = Some(file.file_name.clone());
                        }
                    }
                });
        }

        ui.add_space(15.0);
        ui.label(RichText::new("Share With").strong());
        ui.add(
            egui::TextEdit::singleline(&mut self.share.recipient)
                .desired_width(f32::INFINITY)
                .hint_text("Enter username"),
        );
        ui.add_space(12.0);

        ui.vertical_centered(|ui| {
            let label = if self.share.in_flight() { "⏳ Sharing..." } else { "🔗 Share File" };
            let button = egui::Button::new(label).min_size(egui::vec2(200.0, 36.0));
            if ui.add_enabled(self.share.can_share(), button).clicked() {
                self.submit_share();
            }
        });
    }

    fn render_files(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.heading("Stored Files");
            ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                if ui
                    .add_enabled(!self.files.is_loading(), egui::Button::new("🔄 Refresh"))
                    .clicked()
                {
                    self.refresh_files();
                }
            });
        });
        ui.add_space(12.0);

        if self.files.is_loading() {
            ui.horizontal(|ui| {
                ui.spinner();
                ui.label("Loading files...");
            });
            return;
        }
        if let Some(error) = &self.files.error {
            ui.colored_label(FAILURE, error);
            return;
        }
        if self.files.files.is_empty() {
            ui.label(RichText::new("No files stored yet").color(MUTED));
            return;
        }

        egui::Grid::new("stored_files")
            .striped(true)
            .num_columns(4)
            .spacing([24.0, 8.0])
            .show(ui, |ui| {
                ui.label(RichText::new("File Name").strong());
                ui.label(RichText::new("Size").strong());
                ui.label(RichText::new("Last Modified").strong());
                ui.label(RichText::new("Download").strong());
                ui.end_row();

                for file in &self.files.files {
                    ui.label(&file.file_name);
                    ui.label(format_size(file.size));
                    ui.label(
                        file.last_modified
                            .with_timezone(&Local)
                            .format("%Y-%m-%d %H:%M:%S")
                            .to_string(),
                    );
                    if ui.link("Download").clicked() {
                        if let Err(e) = open::that(&file.download_url) {
                            tracing::warn!("Failed to open {}: {}", file.download_url, e);
                        }
                    }
                    ui.end_row();
                }
            });
    }

    fn render_notices(&mut self, ui: &mut egui::Ui) {
        let mut dismissed = None;
        for (index, notice) in self.notices.items().iter().enumerate() {
            let (icon, color) = match notice.kind {
                NoticeKind::Success => ("✅", SUCCESS),
                NoticeKind::Error => ("❌", FAILURE),
            };
            ui.horizontal(|ui| {
                ui.label(icon);
                ui.colored_label(color, &notice.text);
                ui.with_layout(egui::Layout::right_to_left(Align::Center), |ui| {
                    if ui.small_button("✖").clicked() {
                        dismissed = Some(index);
                    }
                });
            });
        }
        if let Some(index) = dismissed {
            self.notices.dismiss(index);
        }
    }
}
