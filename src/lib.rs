pub mod auth;
pub mod cards;
pub mod controllers;
pub mod db;
pub mod error;
pub mod positions;
pub mod serializers;
pub mod store;
