pub mod data;
pub mod form;
pub mod health;
pub mod info;

pub use data::{get_data, post_data};
pub use health::{health_check, metrics_endpoint};
pub use info::info;
