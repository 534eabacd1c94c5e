pub mod generator;
pub mod model;
pub mod store;
pub mod validator;
pub mod workload;
