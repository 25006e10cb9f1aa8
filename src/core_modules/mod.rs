pub mod bitmap;
pub mod blob_detector;
pub mod classifier;
pub mod frame_source;
pub mod netpbm;
pub mod region;
pub mod segmentation;
pub mod transforms;
pub mod utils;
