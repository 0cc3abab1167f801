/// Data layer: table model, series loading, and the two reshapes.
///
/// Architecture:
/// ```text
///   input Table / Dataset (annotated columns)
///        │
///        ▼
///   ┌──────────┐
///   │ resolve  │  annotations → reference column index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  paths   │  base uri + file name → series path
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  series csv → SeriesFrame
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ wide / long │  pivot or union → output Table
///   └─────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  export  │  Table → arrow / parquet / csv
///   └──────────┘
/// ```

pub mod export;
pub mod loader;
pub mod long;
pub mod model;
pub mod paths;
pub mod resolve;
pub mod wide;
