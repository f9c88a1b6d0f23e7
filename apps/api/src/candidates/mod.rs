pub mod file_store;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod validation;

#[cfg(test)]
pub mod test_support;
