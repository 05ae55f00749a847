mod audio;
mod camera;
mod engine;
mod gate;
mod loader;
mod model;
mod selector;

use audio::AudioBank;
use camera::{CameraView, OrbitCamera};
use clap::Parser;
use eframe::egui;
use engine::{LoadStatus, ViewerEngine};
use glam::{Vec2, Vec3};
use model::Settings;
use selector::Projector;
use std::path::PathBuf;

const DEFAULT_COORDS: &str = "data/tsne-3d-284SoundsFromMars.json";
const BOX_SIZE: f32 = 8.0;

/// Browse a cloud of audio clips laid out by t-SNE and hear the one under the pointer.
#[derive(Parser, Debug)]
#[command(name = "clipscape", version)]
struct Args {
    /// Coordinate file to open at startup
    coords: Option<PathBuf>,
    /// Seconds a clip may play before it is cut (0.1-2.0)
    #[arg(long)]
    max_duration: Option<f32>,
    /// Trigger radius around the pointer in pixels (100-500)
    #[arg(long)]
    mouse_radius: Option<f32>,
    /// Seconds before the same clip can play again (0.2-5.0)
    #[arg(long)]
    pause_length: Option<f32>,
}

impl Args {
    fn settings(&self) -> Settings {
        let defaults = Settings::default();
        Settings {
            max_duration: self.max_duration.unwrap_or(defaults.max_duration),
            mouse_radius: self.mouse_radius.unwrap_or(defaults.mouse_radius),
            pause_length: self.pause_length.unwrap_or(defaults.pause_length),
        }
        .clamped()
    }
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1024.0, 768.0])
        .with_drag_and_drop(true);

    let options = eframe::NativeOptions {
        viewport,
        vsync: true,
        ..Default::default()
    };

    eframe::run_native(
        "Audio t-SNE",
        options,
        Box::new(move |_cc| Box::new(ViewerApp::new(args))),
    )
}

struct ViewerApp {
    engine: ViewerEngine<Box<dyn AudioBank>>,
    camera: OrbitCamera,
    last_pointer: Option<egui::Pos2>,
}

impl ViewerApp {
    fn new(args: Args) -> Self {
        let mut engine = ViewerEngine::new(audio::open_default_bank(), args.settings());
        let path = args.coords.unwrap_or_else(|| PathBuf::from(DEFAULT_COORDS));
        engine.load(&path);

        Self {
            engine,
            camera: OrbitCamera::default(),
            last_pointer: None,
        }
    }

    fn pick_and_load(&mut self) {
        // Use native file dialog to choose a coordinate file
        if let Some(path) = rfd::FileDialog::new()
            .set_title("Which coordinate file to load?")
            .add_filter("JSON", &["json"])
            .pick_file()
        {
            self.engine.load(&path);
        }
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.heading("Audio t-SNE");
        ui.separator();

        let settings = &mut self.engine.settings;
        ui.add(egui::Slider::new(&mut settings.max_duration, model::MAX_DURATION_RANGE).text("maxDuration"));
        ui.add(egui::Slider::new(&mut settings.mouse_radius, model::MOUSE_RADIUS_RANGE).text("mouseRadius"));
        ui.add(egui::Slider::new(&mut settings.pause_length, model::PAUSE_LENGTH_RANGE).text("pauseLength"));

        ui.separator();
        if ui.button("Load model").clicked() {
            self.pick_and_load();
        }

        ui.separator();
        match self.engine.status() {
            LoadStatus::Loaded { clips, skipped } => {
                let catalog = self.engine.catalog();
                if catalog.is_empty() {
                    ui.label("File has no usable entries");
                } else {
                    ui.label(format!("{} clips", clips));
                }
                if *skipped > 0 {
                    ui.label(egui::RichText::new(format!("{} entries skipped", skipped)).color(egui::Color32::YELLOW));
                }
                ui.label(egui::RichText::new(catalog.source.display().to_string()).small());
            }
            LoadStatus::Failed(_) => {
                ui.label(egui::RichText::new("No data").color(egui::Color32::RED));
                ui.label(egui::RichText::new(self.engine.source().display().to_string()).small());
            }
            LoadStatus::NotLoaded => {
                ui.label("No data");
            }
        }
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) = ui.allocate_exact_size(ui.available_size(), egui::Sense::drag());
        let painter = ui.painter_at(rect);
        paint_background(&painter, rect);

        if let LoadStatus::Failed(message) = self.engine.status() {
            painter.text(
                rect.min + egui::vec2(50.0, 50.0),
                egui::Align2::LEFT_TOP,
                format!("{}\nSee the instructions for how to create one.", message),
                egui::FontId::monospace(14.0),
                egui::Color32::BLACK,
            );
            return;
        }
        if !self.engine.is_ready() {
            return;
        }

        // Camera input
        if response.dragged() {
            let d = response.drag_delta();
            self.camera.orbit(Vec2::new(d.x, d.y));
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.scroll_delta.y);
            if scroll != 0.0 {
                self.camera.zoom(scroll);
            }
        }

        let size = Vec2::new(rect.width(), rect.height());
        self.camera.target = Vec3::new(size.x * 0.5, size.y * 0.5, size.x * 0.5);
        let view = self.camera.view(Vec2::new(rect.min.x, rect.min.y), size);

        self.paint_clips(&painter, &view, size);

        let hover = response.hover_pos();
        if let Some(pointer) = hover {
            self.engine.refresh_selection(Vec2::new(pointer.x, pointer.y), size, &view);
            if let Some(sel) = self.engine.selection() {
                paint_selection(&painter, pointer, to_pos(sel.screen), sel.index);
            }
        }

        // Pointer-move trigger runs on the selection computed above
        if hover.is_some() && hover != self.last_pointer && !response.dragged() {
            let now = self.engine.now();
            self.engine.pointer_moved(now);
        }
        self.last_pointer = hover;
    }

    fn paint_clips(&self, painter: &egui::Painter, view: &CameraView, viewport: Vec2) {
        let records = &self.engine.catalog().records;

        // Far to near so closer boxes overlap
        let mut order: Vec<(usize, Vec3, f32)> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let world = r.world_position(viewport);
                (i, world, view.depth(world))
            })
            .filter(|(_, world, _)| view.is_visible(*world))
            .collect();
        order.sort_by(|a, b| b.2.total_cmp(&a.2));

        for (i, world, _) in order {
            let color = if self.engine.is_playing(i) {
                egui::Color32::from_rgba_unmultiplied(0, 255, 0, 180)
            } else {
                egui::Color32::from_rgba_unmultiplied(255, 0, 0, 180)
            };
            let side = (BOX_SIZE * view.pixels_per_unit(world)).max(1.0);
            let center = to_pos(view.world_to_screen(world));
            painter.rect_filled(egui::Rect::from_center_size(center, egui::vec2(side, side)), 0.0, color);
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // A coordinate file dropped on the window replaces the catalog
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if let Some(path) = dropped_coordinate_file(&dropped) {
            self.engine.load(&path);
        }

        // Stop clips that ran past maxDuration
        self.engine.update();

        egui::SidePanel::left("controls")
            .resizable(false)
            .show(ctx, |ui| self.controls(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas(ui));

        // Keep ticking so playback cut-offs happen without input
        ctx.request_repaint();
    }
}

/// First dropped file with a `.json` extension, if any.
fn dropped_coordinate_file(files: &[egui::DroppedFile]) -> Option<PathBuf> {
    files
        .iter()
        .filter_map(|f| f.path.clone())
        .find(|p| p.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("json")))
}

fn to_pos(v: Vec2) -> egui::Pos2 {
    egui::pos2(v.x, v.y)
}

fn paint_background(painter: &egui::Painter, rect: egui::Rect) {
    let top = egui::Color32::from_rgb(100, 200, 0);
    let bottom = egui::Color32::from_rgb(200, 100, 0);

    let mut mesh = egui::Mesh::default();
    mesh.colored_vertex(rect.left_top(), top);
    mesh.colored_vertex(rect.right_top(), top);
    mesh.colored_vertex(rect.right_bottom(), bottom);
    mesh.colored_vertex(rect.left_bottom(), bottom);
    mesh.add_triangle(0, 1, 2);
    mesh.add_triangle(0, 2, 3);
    painter.add(egui::Shape::mesh(mesh));
}

fn paint_selection(painter: &egui::Painter, pointer: egui::Pos2, nearest: egui::Pos2, index: usize) {
    painter.line_segment([nearest, pointer], egui::Stroke::new(1.0, egui::Color32::GRAY));
    painter.circle_stroke(nearest, 4.0, egui::Stroke::new(2.0, egui::Color32::YELLOW));

    // Index label with a dark backing, anchored bottom-left
    let anchor = pointer + egui::vec2(10.0, -10.0);
    let font = egui::FontId::monospace(12.0);
    let galley = painter.layout_no_wrap(index.to_string(), font.clone(), egui::Color32::WHITE);
    let size = galley.size();
    let backing = egui::Rect::from_min_size(egui::pos2(anchor.x, anchor.y - size.y), size).expand(2.0);
    painter.rect_filled(backing, 0.0, egui::Color32::BLACK);
    painter.text(anchor, egui::Align2::LEFT_BOTTOM, index.to_string(), font, egui::Color32::WHITE);
}
