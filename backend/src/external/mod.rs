//! External API integrations

pub mod data_service;

pub use data_service::DataServiceClient;
