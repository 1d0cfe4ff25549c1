//! Service clients and domain services.

pub mod auth;
pub mod checkout;
pub mod printful;
pub mod rss;
pub mod segments;
