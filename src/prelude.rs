//! Imports for syntax extensions.

pub use crate::ParamSet as _;
pub use crate::cookie::CookieStore as _;
