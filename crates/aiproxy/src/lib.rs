pub mod errors;
pub mod history;
pub mod models;
pub mod providers;
pub mod relay;
