//! Root layout.
//!
//! Loads the shop header and the visitor's cart, and wraps every page in
//! the document shell. The cart query runs alongside the layout query and
//! streams into the page after the shell.

use serde::Serialize;
use storefront_data::{CacheMode, DataError, QueryOptions, SessionStore, StorefrontClient};
use storefront_streaming::{escape_html, DeferredSection, Document, HeadContent, RenderError};
use tokio::task::{AbortHandle, JoinHandle};

use crate::queries::{Cart, CartData, LayoutData, CART_QUERY, LAYOUT_QUERY};
use crate::routes::RouteError;
use crate::{FAVICON_PATH, STYLESHEET_PATH};

type CartTask = JoinHandle<Result<Option<Cart>, DataError>>;

/// Root loader output.
#[derive(Debug)]
pub struct RootData {
    pub is_logged_in: bool,
    pub layout: LayoutData,
    cart: Option<CartTask>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RootSnapshot<'a> {
    is_logged_in: bool,
    layout: &'a LayoutData,
}

/// Read the session, start the cart query and load the layout.
pub async fn load(
    client: &StorefrontClient,
    session: &dyn SessionStore,
) -> Result<RootData, RouteError> {
    let (customer_access_token, cart_id) = tokio::join!(
        session.get("customerAccessToken"),
        session.get("cartId"),
    );

    let cart = cart_id.map(|cart_id| {
        let client = client.clone();
        let i18n = client.i18n().clone();
        tokio::spawn(async move {
            let options = QueryOptions::new()
                .with_variable("cartId", cart_id)
                .with_variable("country", i18n.country)
                .with_variable("language", i18n.language)
                .with_cache(CacheMode::None);
            client
                .query::<CartData>(CART_QUERY, options)
                .await
                .map(|data| data.cart)
        })
    });

    let layout = match client.query::<LayoutData>(LAYOUT_QUERY, QueryOptions::new()).await {
        Ok(layout) => layout,
        Err(e) => {
            if let Some(task) = &cart {
                task.abort();
            }
            return Err(e.into());
        }
    };

    Ok(RootData {
        is_logged_in: customer_access_token.is_some_and(|token| !token.is_empty()),
        layout,
        cart,
    })
}

fn head() -> HeadContent {
    HeadContent::default()
        .with_meta("viewport", "width=device-width,initial-scale=1")
        .with_stylesheet(STYLESHEET_PATH)
        .with_preconnect("https://cdn.shopify.com")
        .with_preconnect("https://shop.app")
        .with_icon(FAVICON_PATH, "image/svg+xml")
}

/// Wrap a page body in the root layout.
///
/// Without root data (the root loader failed) the children render bare.
pub fn document(root: Option<RootData>, children: String) -> Document {
    let document = Document::new(head())
        .with_lang("en")
        .with_scroll_restoration();

    let Some(root) = root else {
        return document.with_body(move |_| Ok(children));
    };

    let document = document.with_hydration(&RootSnapshot {
        is_logged_in: root.is_logged_in,
        layout: &root.layout,
    });

    let cart = root.cart.map(cart_section);
    let placeholder = cart.as_ref().map(|s| s.placeholder()).unwrap_or_default();
    let shop = root.layout.shop;

    let document = document.with_body(move |_| {
        Ok(format!(
            r#"<div class="PageLayout"><h1>{} (skeleton)</h1><h2>{}</h2>{}{}</div>"#,
            escape_html(&shop.name),
            escape_html(shop.description.as_deref().unwrap_or_default()),
            placeholder,
            children
        ))
    });

    match cart {
        Some(section) => document.with_deferred(section),
        None => document,
    }
}

/// Cancels the cart query when the section is dropped before it completes.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn cart_section(task: CartTask) -> DeferredSection {
    let guard = AbortOnDrop(task.abort_handle());
    DeferredSection::new(
        "cart",
        r#"<p class="cart">Loading cart...</p>"#,
        async move {
            let _guard = guard;
            match task.await {
                Ok(Ok(Some(cart))) => Ok(render_cart(&cart)),
                Ok(Ok(None)) => Ok(r#"<p class="cart">Your cart is empty</p>"#.to_string()),
                Ok(Err(e)) => Err(RenderError::Component(e.to_string())),
                Err(e) => Err(RenderError::Component(format!("cart query aborted: {}", e))),
            }
        },
    )
}

fn render_cart(cart: &Cart) -> String {
    let total = cart
        .cost
        .as_ref()
        .map(|cost| format!(" <span>{}</span>", escape_html(&cost.total_amount.format())))
        .unwrap_or_default();

    match &cart.checkout_url {
        Some(url) => format!(
            r#"<p class="cart"><a href="{}">Cart ({})</a>{}</p>"#,
            escape_html(url),
            cart.total_quantity,
            total
        ),
        None => format!(r#"<p class="cart">Cart ({}){}</p>"#, cart.total_quantity, total),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::{CartCost, Money};

    fn cart() -> Cart {
        Cart {
            id: "gid://shopify/Cart/1".into(),
            checkout_url: Some("https://checkout.example.com/c/1?key=a&b".into()),
            total_quantity: 2,
            cost: Some(CartCost {
                total_amount: Money {
                    amount: "20.0".into(),
                    currency_code: "CAD".into(),
                },
            }),
        }
    }

    #[test]
    fn test_render_cart() {
        assert_eq!(
            render_cart(&cart()),
            r#"<p class="cart"><a href="https://checkout.example.com/c/1?key=a&amp;b">Cart (2)</a> <span>20.0 CAD</span></p>"#
        );

        let mut bare = cart();
        bare.checkout_url = None;
        bare.cost = None;
        assert_eq!(render_cart(&bare), r#"<p class="cart">Cart (2)</p>"#);
    }

    // === Cart Task Tests ===

    #[tokio::test]
    async fn test_dropped_cart_section_cancels_query() {
        let task: CartTask = tokio::spawn(std::future::pending());
        let handle = task.abort_handle();

        let section = cart_section(task);
        assert!(!handle.is_finished());
        drop(section);

        for _ in 0..10 {
            if handle.is_finished() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(handle.is_finished());
    }

    #[test]
    fn test_document_without_root_data() {
        let document = document(None, "<p>child</p>".into());
        assert_eq!(document.lang, "en");
        assert!(document.head.links.iter().any(|l| l.contains(r#"rel="icon" type="image/svg+xml""#)));
    }
}
