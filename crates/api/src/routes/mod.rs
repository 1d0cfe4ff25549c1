//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # Auth
//! POST /api/auth/register               - Create an account
//! POST /api/auth/login                  - Exchange credentials for a token
//! GET  /api/auth/me                     - Current account
//!
//! # Catalog
//! GET  /api/products                    - Product listing (filters)
//! GET  /api/products/{slug}             - Product detail
//! GET  /api/categories                  - Category listing
//! GET  /api/categories/{slug}           - Category detail
//!
//! # Blog
//! GET  /api/blog                        - Published posts
//! GET  /api/blog/{slug}                 - Published post detail
//! POST /api/blog                        - Create post (create-blog)
//! PUT  /api/blog/{id}                   - Edit post (edit-blog; publish requires publish-blog)
//! DELETE /api/blog/{id}                 - Delete post (delete-blog)
//!
//! # Orders
//! POST /api/orders                      - Place an order (guest or authed)
//! GET  /api/orders/mine                 - Own order history
//! GET  /api/orders/{orderNumber}        - Order detail by number (guest orders need no token)
//! POST /api/orders/{id}/checkout        - Create a hosted checkout session
//!
//! # Account marketing profile
//! GET  /api/users/me/preferences        - Current preferences and profile
//! PUT  /api/users/me/preferences        - Submit a preference/prompt step
//! GET  /api/users/me/profile-prompt     - Next profile prompt step
//! POST /api/users/me/tags               - Add or remove own tags
//! POST /api/users/me/track              - Report an engagement event
//!
//! # Feed proxy
//! GET  /api/feed?url=...                - Proxy an allowlisted RSS feed
//!
//! # Admin
//! GET    /api/admin/stats               - Aggregate store stats
//! GET    /api/admin/dashboard           - Dashboard (stats + recent orders)
//! GET    /api/admin/orders              - All orders (view-all-orders)
//! PATCH  /api/admin/orders/{id}/status  - Update order status (manage-orders)
//! POST   /api/admin/orders/{id}/printful - Submit order for fulfillment
//! GET    /api/admin/orders/{id}/printful - Poll fulfillment status
//! POST   /api/admin/products            - Create product (create-products)
//! PUT    /api/admin/products/{id}       - Update product (edit-products)
//! DELETE /api/admin/products/{id}       - Soft-delete product (delete-products)
//! POST   /api/admin/products/bulk       - Bulk update (edit-products)
//! POST   /api/admin/products/bulk/delete - Bulk soft delete (delete-products)
//! POST   /api/admin/printful/sync       - Import Printful catalog
//! POST   /api/admin/categories          - Create category
//! PUT    /api/admin/categories/{id}     - Update category
//! DELETE /api/admin/categories/{id}     - Delete category
//! GET    /api/admin/users               - List users (view-users)
//! GET    /api/admin/users/{id}          - User detail (view-users)
//! PUT    /api/admin/users/{id}/role     - Change role (manage-roles)
//! POST   /api/admin/users/{id}/tags     - Add tags (edit-users)
//! DELETE /api/admin/users/{id}/tags     - Remove tags (edit-users)
//! GET    /api/admin/segments            - Segment list with counts (view-segments)
//! GET    /api/admin/segments/{name}     - Segment members (view-segments)
//! GET    /api/admin/segments/{name}/export - Segment CSV (export-segments)
//! POST   /api/admin/upload              - Upload an image
//! DELETE /api/admin/upload              - Delete an uploaded image by URL
//! ```

pub mod admin;
pub mod auth;
pub mod blog;
pub mod categories;
pub mod checkout;
pub mod feed;
pub mod health;
pub mod orders;
pub mod printful;
pub mod products;
pub mod upload;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, patch, post, put};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/me", get(auth::me))
}

/// Create the public catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list))
        .route("/products/{slug}", get(products::show))
        .route("/categories", get(categories::list))
        .route("/categories/{slug}", get(categories::show))
}

/// Create the blog routes router.
pub fn blog_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(blog::list).post(blog::create))
        // GET matches on slug; PUT/DELETE take the numeric id in the same
        // position.
        .route(
            "/{slug}",
            get(blog::show).put(blog::update).delete(blog::remove),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(orders::place))
        .route("/mine", get(orders::mine))
        .route("/{id}", get(orders::show))
        .route("/{id}/checkout", post(checkout::create_session))
}

/// Create the account marketing profile routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/me/preferences",
            get(users::preferences).put(users::update_preferences),
        )
        .route("/me/profile-prompt", get(users::profile_prompt))
        .route("/me/tags", post(users::modify_tags))
        .route("/me/track", post(users::track))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(admin::stats))
        .route("/dashboard", get(admin::dashboard))
        .route("/orders", get(orders::list_all))
        .route("/orders/{id}/status", patch(orders::update_status))
        .route(
            "/orders/{id}/printful",
            post(printful::submit_order).get(printful::order_status),
        )
        .route("/products", post(products::create))
        .route(
            "/products/{id}",
            put(products::update).delete(products::remove),
        )
        .route("/products/bulk", post(products::bulk_update))
        .route("/products/bulk/delete", post(products::bulk_delete))
        .route("/printful/sync", post(printful::sync_products))
        .route("/categories", post(categories::create))
        .route(
            "/categories/{id}",
            put(categories::update).delete(categories::remove),
        )
        .route("/users", get(admin::list_users))
        .route("/users/{id}", get(admin::show_user))
        .route("/users/{id}/role", put(admin::update_role))
        .route(
            "/users/{id}/tags",
            post(admin::add_tags).delete(admin::remove_tags),
        )
        .route("/segments", get(admin::list_segments))
        .route("/segments/{name}", get(admin::segment_members))
        .route("/segments/{name}/export", get(admin::export_segment))
        .route(
            "/upload",
            post(upload::upload_image)
                .delete(upload::delete_image)
                // axum caps bodies at 2 MB by default; the handler
                // enforces the real 5 MB limit.
                .layer(DefaultBodyLimit::max(6 * 1024 * 1024)),
        )
}

/// Assemble the full application router.
pub fn router() -> Router<AppState> {
    let api = Router::new()
        .nest("/auth", auth_routes())
        .merge(catalog_routes())
        .nest("/blog", blog_routes())
        .nest("/orders", order_routes())
        .nest("/users", user_routes())
        .nest("/admin", admin_routes())
        .route("/feed", get(feed::proxy));

    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/api", api)
}

/// Confirm the routers build without panicking (axum validates route
/// syntax at construction time).
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builds() {
        let _ = router();
    }
}
