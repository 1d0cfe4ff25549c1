//! Row models shared between the repository layer and route handlers.

pub mod category;
pub mod order;
pub mod post;
pub mod product;
pub mod user;

pub use category::Category;
pub use order::{Order, OrderItem, OrderSummary};
pub use post::BlogPost;
pub use product::{Product, ProductVariant};
pub use user::{MarketingProfile, User};
