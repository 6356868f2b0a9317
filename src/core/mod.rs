pub mod batch;
pub mod extract;
pub mod formats;
pub mod projection;
pub mod writer;
