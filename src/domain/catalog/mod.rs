mod admin_products;
mod browse;
mod errors;
mod model;
mod search;

pub use admin_products::{
    UploadQuery, admin_product_endpoint, admin_products_endpoint, create_product,
    create_product_endpoint, delete_product, delete_product_endpoint, list_products,
    update_product, update_product_endpoint, upload_image_endpoint,
};
pub use browse::{
    CategoryCount, all_categories, categories_endpoint, featured_products,
    featured_products_endpoint, latest_products, latest_products_endpoint, product_by_id,
    product_by_slug, product_by_slug_endpoint,
};
pub use errors::CatalogError;
pub use model::{Product, ProductInput, find_product};
pub use search::{SearchFilter, SearchQuery, SortOrder, search_products, search_products_endpoint};
