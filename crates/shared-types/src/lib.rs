pub mod error;
pub mod feature_flags;

pub mod models;
pub mod requests;

// Homestead domain modules (canonical locations for all dealer domain types)
pub mod analytics;
pub mod chat;
pub mod common;
pub mod delivery;
pub mod estimate;
pub mod faq;
pub mod markup;
pub mod pricing;
pub mod session;
pub mod settings;

pub use error::*;
pub use feature_flags::*;
pub use models::*;
pub use requests::*;

// Re-export all domain types
pub use analytics::*;
pub use chat::*;
pub use common::*;
pub use delivery::*;
pub use estimate::*;
pub use faq::*;
pub use markup::*;
pub use pricing::*;
pub use session::*;
pub use settings::*;
