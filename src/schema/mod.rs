pub mod mapping;

pub use mapping::{DocumentFieldMapping, RuntimeMapping};
