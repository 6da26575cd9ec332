pub mod analytics;
pub mod assignment;
pub mod chat;
pub mod dealer;
pub mod delivery;
pub mod estimate;
pub mod faq;
pub mod gps;
pub mod markup;
pub mod photo;
pub mod profile;
pub mod settings;
pub mod tracking;
pub mod user;
