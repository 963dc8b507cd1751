mod app;
mod elements;
mod export;
mod layout;
mod lod;
mod snapshot;
mod util;
mod visibility;

use std::path::PathBuf;

use clap::Parser;

use snapshot::Scope;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to an entity graph snapshot (JSON).
    snapshot: PathBuf,

    /// Restrict the view to the neighborhood of this entity id.
    #[arg(long)]
    focus: Option<String>,

    /// Traversal depth when --focus is set.
    #[arg(long, default_value_t = 2)]
    depth: usize,

    /// Node cap for the focused neighborhood.
    #[arg(long, default_value_t = 500)]
    max_nodes: usize,
}

fn main() -> eframe::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let scope = match args.focus {
        Some(center) => Scope::Neighborhood {
            center,
            depth: args.depth,
            max_nodes: args.max_nodes.max(1),
        },
        None => Scope::Global,
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "entilens",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::EntiLensApp::new(
                cc,
                args.snapshot.clone(),
                scope.clone(),
            )))
        }),
    )
}
