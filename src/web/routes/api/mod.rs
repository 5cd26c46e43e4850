pub mod subscribe;
pub mod tees;

pub use subscribe::subscribe;
pub use tees::{tees_archive, tees_current};
