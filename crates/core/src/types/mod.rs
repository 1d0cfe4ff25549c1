//! Shared domain types.

pub mod email;
pub mod id;
pub mod money;
pub mod role;
pub mod slug;
pub mod status;
pub mod tags;

pub use email::{Email, EmailError};
pub use id::{CategoryId, OrderId, PostId, ProductId, UserId};
pub use money::{FLAT_SHIPPING_FEE, FREE_SHIPPING_THRESHOLD, OrderTotals, TAX_RATE, round_money};
pub use role::{Permission, Role, RoleError};
pub use slug::{Slug, SlugError};
pub use status::{OrderStatus, PaymentStatus, StatusError};
pub use tags::{add_tags, remove_tags};
