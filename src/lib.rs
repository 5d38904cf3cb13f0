pub mod controllers;
pub mod db;
pub mod error;
pub mod models;
pub mod routers;
pub mod secrets;
