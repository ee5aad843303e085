use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CollisionError {
    #[error("size of chart should be specified as [width, height], got {len} values")]
    InvalidChartSize { len: usize },
    #[error("chart size must be finite and non-negative, got [{width}, {height}]")]
    NonFiniteChartSize { width: f32, height: f32 },
    #[error("chart of [{width}, {height}] exceeds the {max} pixel raster limit")]
    ChartTooLarge { width: f32, height: f32, max: u64 },
}

pub type Result<T> = std::result::Result<T, CollisionError>;
