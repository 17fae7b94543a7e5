//! Product detail page.

use storefront_data::{QueryOptions, StorefrontClient};
use storefront_streaming::escape_html;

use crate::queries::{Product, ProductData, PRODUCT_QUERY};
use crate::routes::RouteError;

/// Load a product by handle. A product without an id is a 404.
pub async fn load(client: &StorefrontClient, handle: &str) -> Result<Product, RouteError> {
    if handle.is_empty() {
        return Err(RouteError::Thrown(
            "Expected product handle to be defined".into(),
        ));
    }

    let data: ProductData = client
        .query(
            PRODUCT_QUERY,
            QueryOptions::new().with_variable("handle", handle),
        )
        .await?;

    data.product
        .filter(|product| product.id.as_deref().is_some_and(|id| !id.is_empty()))
        .ok_or_else(RouteError::not_found)
}

/// Body of `/products/{handle}`. The description is merchant HTML, inserted
/// as-is and never nonced.
pub fn view(product: &Product) -> String {
    format!(
        r#"<div class="product"><h1>{}</h1><br/><p><strong>Description</strong></p><br/><div>{}</div><br/></div>"#,
        escape_html(&product.title),
        product.description_html
    )
}
