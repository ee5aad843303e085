pub mod bitmap;
pub mod bounds;
#[cfg(feature = "cli")]
pub mod cli;
pub mod collision;
pub mod config;
pub mod error;
pub mod label;
pub mod mark;
pub mod placer;
pub mod raster;
pub mod render;
pub mod scene;
pub mod text_metrics;

pub use bitmap::{Bitmaps, OccupancyGrid};
pub use bounds::{find_collision, mark_bounds, BoundsScope, MarkBounds};
#[cfg(feature = "cli")]
pub use cli::run;
pub use collision::{
    resolve_label_collision, CollisionOutcome, LabelDecision, LabelKey, LabelOutcome, LabelSpec,
    Placement,
};
pub use config::{ChartSize, CollisionOptions, OptionsOverlay};
pub use error::CollisionError;
pub use label::{Align, AnchorPosition, Baseline, LabelItem};
pub use mark::{MarkItem, Shape};
pub use placer::{Candidate, LabelPlacer};
pub use raster::Rasterizer;
pub use scene::{parse_scene, run_scene, Scene, ScenePass};
pub use text_metrics::{FontMetrics, HeuristicMetrics, SystemFontMetrics};
