mod colony;
mod commodity;
mod pin;
mod route;

pub use colony::*;
pub use commodity::*;
pub use pin::*;
pub use route::*;
