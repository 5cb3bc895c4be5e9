#![doc = include_str!("../README.md")]

mod error;
mod ident;
mod loader;
mod reclaim;
mod session;
mod store;
mod workload;

pub use crate::error::*;
pub use crate::ident::*;
pub use crate::loader::*;
pub use crate::reclaim::*;
pub use crate::session::*;
pub use crate::store::*;
pub use crate::workload::*;
