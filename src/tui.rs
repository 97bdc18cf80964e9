mod app;
mod keys;
mod ui;

pub use app::run;
