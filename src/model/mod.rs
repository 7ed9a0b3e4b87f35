pub mod config;
pub mod schema;
pub mod value;

pub use config::*;
pub use schema::*;
pub use value::*;
