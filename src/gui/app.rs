//! Main Iced application for the TrapScale GUI.

use std::path::Path;
use std::sync::Arc;

use iced::widget::image as image_widget;
use iced::widget::{
    button, canvas, column, container, horizontal_rule, horizontal_space, pick_list, row,
    scrollable, stack, text, text_input, vertical_space,
};
use iced::{ContentFit, Element, Length, Point, Rectangle, Task, Theme};
use uuid::Uuid;

use crate::client::{ApiClient, CalibrationRecord, Session};
use crate::geometry::{fit_within, CanvasBounds, ViewportGeometry};
use crate::render::{CalibrationRenderer, RenderStyle};
use crate::scale::{Unit, ALL_UNITS};
use crate::settings::AppSettings;
use crate::widget::{self, LoadedImage, NoticeKind, RequestId, WidgetState};

use super::logger::Logger;
use super::overlay::ClickOverlay;

/// Current view/tab of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Calibrate,
    Settings,
    Logs,
}

/// Messages for the Iced application.
#[derive(Debug, Clone)]
pub enum Message {
    // Navigation
    SwitchView(View),

    // Image selection
    ProjectIdChanged(String),
    ImageIdChanged(String),
    LoadImage,
    ImageFetched(RequestId, Result<LoadedImage, String>),
    CalibrationFetched(RequestId, Result<Option<CalibrationRecord>, String>),

    // Calibration workflow
    CanvasClicked(Point, Rectangle),
    DistanceChanged(String),
    UnitSelected(Unit),
    ResetPoints,
    SaveCalibration,
    SaveFinished(RequestId, Result<CalibrationRecord, String>),
    DismissNotice,

    // Settings
    ApiBaseChanged(String),
    AuthTokenChanged(String),
    FontPathChanged(String),
    MaxWidthChanged(String),
    MaxHeightChanged(String),
    SaveSettings,
    ResetSettings,
    SettingsSaved(Result<(), String>),

    // Logs
    ClearLogs,
}

/// Main application struct.
pub struct TrapScaleApp {
    // Current view
    view: View,

    // Settings
    settings: AppSettings,

    // Input fields as strings
    project_id_input: String,
    image_id_input: String,
    max_width_input: String,
    max_height_input: String,

    // Calibration widget state and its rendered frame
    state: WidgetState,
    renderer: CalibrationRenderer,
    frame: Option<image_widget::Handle>,

    // Logger
    logger: Logger,

    // Status message
    status: String,
}

impl Default for TrapScaleApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TrapScaleApp {
    /// Create a new application instance.
    pub fn new() -> Self {
        let settings = AppSettings::load();
        let mut logger = Logger::new();
        logger.info("TrapScale GUI started");

        let mut state = WidgetState::new(settings.project_id.clone(), "")
            .with_max_display(settings.max_display_width, settings.max_display_height);
        state.unit = settings.default_unit();

        Self {
            view: View::Calibrate,
            project_id_input: settings.project_id.clone(),
            image_id_input: String::new(),
            max_width_input: settings.max_display_width.to_string(),
            max_height_input: settings.max_display_height.to_string(),
            state,
            renderer: build_renderer(&settings),
            frame: None,
            settings,
            logger,
            status: "Ready".to_string(),
        }
    }

    /// Get the window title.
    pub fn title(&self) -> String {
        "TrapScale - Camera Trap Calibration".to_string()
    }

    /// Get the theme.
    pub fn theme(&self) -> Theme {
        Theme::Dark
    }

    /// Apply a widget event and re-render the frame so the canvas never
    /// shows a stale projection of the state.
    fn apply(&mut self, event: widget::Event) {
        self.state = widget::reduce(self.state.clone(), event);
        self.redraw();
    }

    fn redraw(&mut self) {
        self.frame = self.state.image.as_ref().map(|loaded| {
            let frame = self.renderer.render(
                &loaded.pixels,
                &self.state.viewport,
                &self.state.selection.points(),
            );
            let (width, height) = frame.dimensions();
            image_widget::Handle::from_rgba(width, height, frame.into_raw())
        });
    }

    /// Re-fit an already-loaded image into the current display bounding box
    /// and redraw at the new layout size.
    fn refit_viewport(&mut self) {
        if let Some(loaded) = &self.state.image {
            let (canvas_w, canvas_h) = fit_within(
                loaded.meta.natural_width,
                loaded.meta.natural_height,
                self.state.max_display.0,
                self.state.max_display.1,
            );
            self.state.viewport = ViewportGeometry::new(
                canvas_w,
                canvas_h,
                loaded.meta.natural_width as f64,
                loaded.meta.natural_height as f64,
            );
            self.redraw();
        }
    }

    /// Update the application state based on messages.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            // Navigation
            Message::SwitchView(view) => {
                self.view = view;
                Task::none()
            }

            // Image selection
            Message::ProjectIdChanged(value) => {
                self.project_id_input = value;
                Task::none()
            }
            Message::ImageIdChanged(value) => {
                self.image_id_input = value;
                Task::none()
            }
            Message::LoadImage => {
                let project_id = self.project_id_input.trim().to_string();
                let image_id = self.image_id_input.trim().to_string();
                if project_id.is_empty() || image_id.is_empty() {
                    self.logger.warning("Enter a project id and an image id");
                    return Task::none();
                }

                let request = Uuid::new_v4();
                self.state.project_id = project_id.clone();
                self.apply(widget::Event::FetchStarted {
                    request,
                    image_id: image_id.clone(),
                });
                self.logger
                    .info(format!("Loading image {} for project {}", image_id, project_id));
                self.status = "Loading...".to_string();

                let image_task = {
                    let settings = self.settings.clone();
                    Task::perform(
                        async move { fetch_image(settings, image_id).await },
                        move |result| Message::ImageFetched(request, result),
                    )
                };
                let calibration_task = {
                    let settings = self.settings.clone();
                    Task::perform(
                        async move { fetch_calibration(settings, project_id).await },
                        move |result| Message::CalibrationFetched(request, result),
                    )
                };
                Task::batch([image_task, calibration_task])
            }
            Message::ImageFetched(request, result) => {
                match &result {
                    Ok(loaded) => {
                        self.logger.success(format!(
                            "Image loaded: {}x{} pixels",
                            loaded.meta.natural_width, loaded.meta.natural_height
                        ));
                        self.status = "Image loaded".to_string();
                    }
                    Err(e) => {
                        self.logger.error(format!("Image load failed: {}", e));
                        self.status = "Image load failed".to_string();
                    }
                }
                self.apply(widget::Event::ImageLoaded { request, result });
                Task::none()
            }
            Message::CalibrationFetched(request, result) => {
                match &result {
                    Ok(Some(record)) => {
                        self.logger.info(format!(
                            "Existing calibration found: 1 pixel = {:.6} {}",
                            record.real_distance_per_pixel, record.unit
                        ));
                    }
                    Ok(None) => {
                        self.logger.info("No existing calibration for this project");
                    }
                    Err(e) => {
                        self.logger.error(format!("Calibration fetch failed: {}", e));
                    }
                }
                self.apply(widget::Event::CalibrationFetched { request, result });
                Task::none()
            }

            // Calibration workflow
            Message::CanvasClicked(position, bounds) => {
                self.apply(widget::Event::Click {
                    client_x: position.x as f64,
                    client_y: position.y as f64,
                    bounds: CanvasBounds::new(
                        bounds.x as f64,
                        bounds.y as f64,
                        bounds.width as f64,
                        bounds.height as f64,
                    ),
                });
                if let Some(point) = self.state.selection.points().last() {
                    self.logger.info(format!(
                        "Point {} marked at ({:.1}, {:.1}) in image space",
                        self.state.selection.len(),
                        point.x,
                        point.y
                    ));
                }
                Task::none()
            }
            Message::DistanceChanged(value) => {
                self.apply(widget::Event::DistanceChanged(value));
                Task::none()
            }
            Message::UnitSelected(unit) => {
                self.apply(widget::Event::UnitSelected(unit));
                Task::none()
            }
            Message::ResetPoints => {
                self.apply(widget::Event::Reset);
                self.logger.info("Selection reset");
                Task::none()
            }
            Message::SaveCalibration => {
                if !self.state.can_save() {
                    return Task::none();
                }
                match self.state.save_request() {
                    Ok(record) => {
                        let request = Uuid::new_v4();
                        self.apply(widget::Event::SaveStarted { request });
                        self.status = "Saving...".to_string();

                        let settings = self.settings.clone();
                        Task::perform(
                            async move { save_calibration(settings, record).await },
                            move |result| Message::SaveFinished(request, result),
                        )
                    }
                    Err(e) => {
                        self.logger.error(format!("Cannot save: {}", e));
                        self.status = format!("Cannot save: {}", e);
                        Task::none()
                    }
                }
            }
            Message::SaveFinished(request, result) => {
                match &result {
                    Ok(record) => {
                        self.logger.success(format!(
                            "Calibration saved: 1 pixel = {:.6} {}",
                            record.real_distance_per_pixel, record.unit
                        ));
                        self.status = "Calibration saved".to_string();
                    }
                    Err(e) => {
                        self.logger.error(format!("Save failed: {}", e));
                        self.status = "Save failed".to_string();
                    }
                }
                self.apply(widget::Event::SaveCompleted { request, result });
                Task::none()
            }
            Message::DismissNotice => {
                self.apply(widget::Event::NoticeDismissed);
                Task::none()
            }

            // Settings
            Message::ApiBaseChanged(value) => {
                self.settings.api_base_url = value;
                Task::none()
            }
            Message::AuthTokenChanged(value) => {
                self.settings.auth_token = value;
                Task::none()
            }
            Message::FontPathChanged(value) => {
                self.settings.label_font_path = value;
                Task::none()
            }
            Message::MaxWidthChanged(value) => {
                self.max_width_input = value.clone();
                if let Ok(v) = value.parse() {
                    self.settings.max_display_width = v;
                }
                Task::none()
            }
            Message::MaxHeightChanged(value) => {
                self.max_height_input = value.clone();
                if let Ok(v) = value.parse() {
                    self.settings.max_display_height = v;
                }
                Task::none()
            }
            Message::SaveSettings => {
                self.settings.project_id = self.project_id_input.trim().to_string();
                let settings = self.settings.clone();
                Task::perform(async move { settings.save() }, Message::SettingsSaved)
            }
            Message::ResetSettings => {
                self.settings = AppSettings::default();
                self.max_width_input = self.settings.max_display_width.to_string();
                self.max_height_input = self.settings.max_display_height.to_string();
                self.renderer = build_renderer(&self.settings);
                self.logger.info("Settings reset to defaults");
                Task::none()
            }
            Message::SettingsSaved(result) => {
                match result {
                    Ok(()) => {
                        self.renderer = build_renderer(&self.settings);
                        self.state.max_display = (
                            self.settings.max_display_width,
                            self.settings.max_display_height,
                        );
                        self.refit_viewport();
                        self.logger.success("Settings saved");
                        self.status = "Settings saved".to_string();
                    }
                    Err(e) => {
                        self.logger.error(format!("Failed to save settings: {}", e));
                        self.status = format!("Save failed: {}", e);
                    }
                }
                Task::none()
            }

            // Logs
            Message::ClearLogs => {
                self.logger.clear();
                self.logger.info("Logs cleared");
                Task::none()
            }
        }
    }

    /// Build the view.
    pub fn view(&self) -> Element<'_, Message> {
        let content = match self.view {
            View::Calibrate => self.view_calibrate(),
            View::Settings => self.view_settings(),
            View::Logs => self.view_logs(),
        };

        let nav_bar = self.view_nav_bar();
        let status_bar = self.view_status_bar();

        column![nav_bar, content, status_bar]
            .spacing(10)
            .padding(20)
            .into()
    }

    /// Navigation bar.
    fn view_nav_bar(&self) -> Element<'_, Message> {
        let calibrate_btn = button(text("Calibrate"))
            .on_press(Message::SwitchView(View::Calibrate))
            .style(if self.view == View::Calibrate {
                button::primary
            } else {
                button::secondary
            });

        let settings_btn = button(text("Settings"))
            .on_press(Message::SwitchView(View::Settings))
            .style(if self.view == View::Settings {
                button::primary
            } else {
                button::secondary
            });

        let logs_btn = button(text("Logs"))
            .on_press(Message::SwitchView(View::Logs))
            .style(if self.view == View::Logs {
                button::primary
            } else {
                button::secondary
            });

        row![calibrate_btn, settings_btn, logs_btn].spacing(10).into()
    }

    /// Status bar.
    fn view_status_bar(&self) -> Element<'_, Message> {
        let state_text = if self.state.is_loading() {
            "Loading"
        } else if self.state.pending_save.is_some() {
            "Saving"
        } else {
            "Ready"
        };

        row![
            text(state_text).size(14),
            horizontal_space(),
            text(&self.status).size(14),
        ]
        .padding(10)
        .into()
    }

    /// Calibration view: image selection, the click canvas, and the
    /// distance/unit inputs.
    fn view_calibrate(&self) -> Element<'_, Message> {
        let title = text("Distance Calibration").size(28);

        let project_input = text_input("project id", &self.project_id_input)
            .on_input(Message::ProjectIdChanged)
            .width(180);
        let image_input = text_input("image id", &self.image_id_input)
            .on_input(Message::ImageIdChanged)
            .on_submit(Message::LoadImage)
            .width(180);
        let load_btn = button(text("Load"))
            .on_press(Message::LoadImage)
            .padding([8, 20]);

        let load_row = row![project_input, image_input, load_btn].spacing(10);

        column![
            title,
            vertical_space().height(5),
            load_row,
            self.view_notice(),
            self.view_canvas(),
            self.view_controls(),
            self.view_scale_info(),
        ]
        .spacing(10)
        .height(Length::Fill)
        .into()
    }

    /// The rendered frame with the transparent click overlay on top. The
    /// overlay and the image share the same fixed size, so overlay bounds
    /// equal the displayed image exactly.
    fn view_canvas(&self) -> Element<'_, Message> {
        if let Some(error) = &self.state.image_error {
            return container(text(format!("Failed to load image: {}", error)).size(16))
                .padding(20)
                .into();
        }
        if self.state.is_loading() {
            return container(text("Loading calibration tool...").size(16))
                .padding(20)
                .into();
        }
        let Some(frame) = &self.frame else {
            return container(
                text("Load a reference image, then click two points a known distance apart.")
                    .size(14),
            )
            .padding(20)
            .into();
        };

        let width = Length::Fixed(self.state.viewport.canvas_width as f32);
        let height = Length::Fixed(self.state.viewport.canvas_height as f32);

        let layers = stack![
            image_widget(frame.clone())
                .content_fit(ContentFit::Fill)
                .width(width)
                .height(height),
            canvas(ClickOverlay::new(Message::CanvasClicked))
                .width(width)
                .height(height),
        ];

        container(layers).padding(5).into()
    }

    /// Dismissible success/error notice.
    fn view_notice(&self) -> Element<'_, Message> {
        let Some(notice) = &self.state.notice else {
            return row![].into();
        };
        let label = match notice.kind {
            NoticeKind::Success => "OK",
            NoticeKind::Error => "Error",
        };
        row![
            text(format!("{}: {}", label, notice.text)).size(14),
            horizontal_space(),
            button(text("Dismiss").size(12))
                .on_press(Message::DismissNotice)
                .style(button::secondary),
        ]
        .spacing(10)
        .into()
    }

    /// Distance input, unit picker, save and reset actions.
    fn view_controls(&self) -> Element<'_, Message> {
        let points_text = text(format!(
            "Points marked: {}/2",
            self.state.selection.len()
        ))
        .size(14);

        let distance_input = text_input("real distance, e.g. 50", &self.state.distance_input)
            .on_input(Message::DistanceChanged)
            .width(160);

        let unit_picker = pick_list(
            ALL_UNITS.to_vec(),
            Some(self.state.unit),
            Message::UnitSelected,
        )
        .width(100);

        let save_btn = button(text("Save calibration"))
            .on_press_maybe(self.state.can_save().then_some(Message::SaveCalibration))
            .style(button::success)
            .padding([8, 20]);

        let reset_btn = button(text("Reset points"))
            .on_press(Message::ResetPoints)
            .style(button::secondary)
            .padding([8, 20]);

        column![
            points_text,
            row![distance_input, unit_picker, save_btn, reset_btn].spacing(10),
        ]
        .spacing(8)
        .into()
    }

    /// Current scale panel, shown once a calibration exists.
    fn view_scale_info(&self) -> Element<'_, Message> {
        let Some(record) = &self.state.calibration else {
            return column![].into();
        };
        column![
            horizontal_rule(1),
            text(format!(
                "Scale: 1 pixel = {:.6} {}",
                record.real_distance_per_pixel, record.unit
            ))
            .size(15),
            text(format!(
                "Reference: {} {} across {:.1} native pixels",
                record.distance, record.unit, record.pixel_distance
            ))
            .size(12),
        ]
        .spacing(4)
        .into()
    }

    /// Settings view.
    fn view_settings(&self) -> Element<'_, Message> {
        let title = text("Settings").size(28);

        let api_base = labeled_input(
            "API base URL",
            &self.settings.api_base_url,
            "http://localhost:5000",
            Message::ApiBaseChanged,
        );

        let auth_token = labeled_input(
            "Auth token",
            &self.settings.auth_token,
            "leave empty for anonymous",
            Message::AuthTokenChanged,
        );

        let font_path = labeled_input(
            "Label font path",
            &self.settings.label_font_path,
            "/path/to/font.ttf (optional)",
            Message::FontPathChanged,
        );

        let max_width = labeled_input(
            "Max display width",
            &self.max_width_input,
            "800",
            Message::MaxWidthChanged,
        );

        let max_height = labeled_input(
            "Max display height",
            &self.max_height_input,
            "500",
            Message::MaxHeightChanged,
        );

        let save_btn = button(text("Save settings"))
            .on_press(Message::SaveSettings)
            .style(button::success)
            .padding([10, 20]);

        let reset_btn = button(text("Reset defaults"))
            .on_press(Message::ResetSettings)
            .style(button::secondary)
            .padding([10, 20]);

        let actions = row![save_btn, reset_btn].spacing(10);

        let content = column![
            title,
            vertical_space().height(10),
            api_base,
            auth_token,
            horizontal_rule(1),
            font_path,
            max_width,
            max_height,
            vertical_space().height(20),
            actions,
        ]
        .spacing(15)
        .padding(10);

        scrollable(content).height(Length::Fill).into()
    }

    /// Logs view.
    fn view_logs(&self) -> Element<'_, Message> {
        let title = text("Logs").size(28);

        let clear_btn = button(text("Clear logs"))
            .on_press(Message::ClearLogs)
            .style(button::secondary);

        let header = row![title, horizontal_space(), clear_btn];

        let log_content = self.logger.format_all();
        let log_view = scrollable(text(log_content).size(13)).height(Length::Fill);

        let log_container = container(log_view)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(10)
            .style(container::bordered_box);

        let log_path = self
            .logger
            .log_file_path()
            .map(|p| format!("Log file: {}", p.display()))
            .unwrap_or_else(|| "Log file: not created".to_string());

        column![
            header,
            vertical_space().height(10),
            log_container,
            text(log_path).size(12),
        ]
        .spacing(10)
        .height(Length::Fill)
        .into()
    }
}

/// Helper function to create a labeled input row.
fn labeled_input<'a>(
    label: &'a str,
    value: &'a str,
    placeholder: &'a str,
    on_change: impl Fn(String) -> Message + 'a,
) -> Element<'a, Message> {
    row![
        text(label).width(140),
        text_input(placeholder, value)
            .on_input(on_change)
            .width(300),
    ]
    .spacing(10)
    .into()
}

/// Renderer configured from the saved settings; label text is skipped when
/// no font path is set or the file cannot be loaded.
fn build_renderer(settings: &AppSettings) -> CalibrationRenderer {
    let mut style = RenderStyle::default();
    if !settings.label_font_path.is_empty() {
        if let Some(font) = RenderStyle::load_font(Path::new(&settings.label_font_path)) {
            style = style.with_font(font);
        }
    }
    CalibrationRenderer::new(style)
}

fn build_client(settings: &AppSettings) -> ApiClient {
    let session = if settings.auth_token.is_empty() {
        Session::anonymous()
    } else {
        Session::with_token(settings.auth_token.clone())
    };
    ApiClient::new(settings.api_base_url.clone(), session)
}

/// Fetch and decode the reference image asynchronously.
async fn fetch_image(settings: AppSettings, image_id: String) -> Result<LoadedImage, String> {
    let fetched = build_client(&settings)
        .fetch_image(&image_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(LoadedImage {
        meta: fetched.meta,
        pixels: Arc::new(fetched.pixels),
    })
}

/// Fetch the project's calibration record asynchronously.
async fn fetch_calibration(
    settings: AppSettings,
    project_id: String,
) -> Result<Option<CalibrationRecord>, String> {
    build_client(&settings)
        .fetch_calibration(&project_id)
        .await
        .map_err(|e| e.to_string())
}

/// Save the calibration record and return the server's canonical one.
async fn save_calibration(
    settings: AppSettings,
    record: CalibrationRecord,
) -> Result<CalibrationRecord, String> {
    build_client(&settings)
        .save_calibration(&record)
        .await
        .map_err(|e| e.to_string())
}
