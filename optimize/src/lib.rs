pub mod optimize;

pub use optimize::optimize;
