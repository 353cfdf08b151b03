use eframe::{NativeOptions, egui};
use locusview::{about, app};
use std::env;

fn load_icon(path: &str) -> Option<egui::IconData> {
    let image = image::open(path).ok()?.into_rgba8();
    let (width, height) = image.dimensions();
    Some(egui::IconData {
        rgba: image.into_raw(),
        width,
        height,
    })
}

fn main() -> eframe::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", about::version_cli_text());
        return Ok(());
    }
    // data directory or http(s) base URL
    let location = args.iter().find(|a| !a.starts_with('-')).cloned();

    let mut viewport = egui::ViewportBuilder::default()
        .with_inner_size([1100.0, 700.0])
        .with_min_inner_size([500.0, 300.0]);
    if let Some(icon) = load_icon("assets/icon.png") {
        viewport = viewport.with_icon(icon);
    }
    let options = NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        "LocusView",
        options,
        Box::new(move |_cc| Ok(Box::new(app::LocusViewApp::new(location.as_deref())))),
    )
}
