//! Business logic services for the Sign Production Management platform

pub mod container;
pub mod lead;
pub mod material;
pub mod mockup;
pub mod order;
pub mod release;
pub mod stock;
pub mod storage;

pub use container::ContainerService;
pub use lead::LeadService;
pub use material::MaterialService;
pub use mockup::MockupService;
pub use order::OrderService;
pub use release::ReleaseService;
pub use stock::StockService;
pub use storage::StorageService;
