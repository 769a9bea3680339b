pub mod near;

pub mod models;
pub mod errors;
pub mod settings;
pub mod accounts;
pub mod validator;
pub mod balance;
pub mod controller;

pub mod utils;
