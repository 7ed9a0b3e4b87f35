pub mod backend;
pub mod cli;
pub mod io;
pub mod model;
pub mod ops;
pub mod tui;
pub mod util;
pub mod widget;
