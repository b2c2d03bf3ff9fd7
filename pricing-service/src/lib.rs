pub mod app;
pub mod calculator;
pub mod config;
pub mod discount_handlers;
pub mod eligibility;
pub mod model;
pub mod pricing;
pub mod repo;
pub mod retry;
pub mod selector;
pub mod tax;
pub mod tax_handlers;

pub use app::{build_router, AppState};
pub use config::PricingConfig;
pub use pricing::{PricingService, PricingSettings};
