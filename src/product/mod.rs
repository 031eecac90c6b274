//! Products are the trips that budgets are planned for.

mod core;
mod endpoints;

pub use self::core::{
    Product, ProductId, create_product, create_product_table, get_all_products, get_product,
};
pub use endpoints::{create_product_endpoint, get_product_endpoint, list_products_endpoint};
