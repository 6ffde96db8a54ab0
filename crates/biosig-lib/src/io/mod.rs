//! Reading signals from disk and saving whole datasets.

pub mod composite;
pub mod csv;
pub mod text;

pub use composite::{load_composite_data, save_composite_data};
pub use self::csv::import_wave_csv;
pub use text::{import_points, import_wave, import_wave_samples};
