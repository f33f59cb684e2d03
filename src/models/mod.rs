pub mod appointment;
pub mod handler;
pub mod session;

pub use appointment::*;
pub use handler::*;
pub use session::*;
