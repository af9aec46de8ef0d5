pub mod error;
pub mod repository;

pub use error::StoreError;
pub use repository::{Page, Repository};
