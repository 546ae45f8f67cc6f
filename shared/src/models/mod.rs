//! Domain models for the Sign Production Management platform

mod bom;
mod lead;
mod material;
mod mockup;
mod order;
mod payment;
mod release;
mod stock;
mod user;

pub use bom::*;
pub use lead::*;
pub use material::*;
pub use mockup::*;
pub use order::*;
pub use payment::*;
pub use release::*;
pub use stock::*;
pub use user::*;
