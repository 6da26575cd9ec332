pub mod config;
pub mod db;
pub mod error_convert;
pub mod health;
pub mod openapi;
pub mod rate_limit;
pub mod tenant;
pub mod telemetry;

pub mod auth;
pub mod gps_buffer;
pub mod pricing;

pub mod mailgun;
pub mod s3;
pub mod twilio;

// Homestead domain modules
pub mod repo;
pub mod rest;
