//! Storefront API documents and their response shapes.

use serde::{Deserialize, Serialize};

/// Shop name and description for the page layout.
pub const LAYOUT_QUERY: &str = r#"query layout {
  shop {
    name
    description
  }
}"#;

/// A single product by handle.
pub const PRODUCT_QUERY: &str = r#"query Product($handle: String!) {
  product(handle: $handle) {
    id
    title
    descriptionHtml
  }
}"#;

/// The visitor's cart.
pub const CART_QUERY: &str = r#"query CartQuery($cartId: ID!, $country: CountryCode, $language: LanguageCode)
  @inContext(country: $country, language: $language) {
  cart(id: $cartId) {
    ...CartFragment
  }
}

fragment CartFragment on Cart {
  id
  checkoutUrl
  totalQuantity
  buyerIdentity {
    countryCode
    customer {
      id
      email
      firstName
      lastName
      displayName
    }
    email
    phone
  }
  lines(first: 100) {
    edges {
      node {
        id
        quantity
        attributes {
          key
          value
        }
        cost {
          totalAmount {
            amount
            currencyCode
          }
          amountPerQuantity {
            amount
            currencyCode
          }
          compareAtAmountPerQuantity {
            amount
            currencyCode
          }
        }
        merchandise {
          ... on ProductVariant {
            id
            availableForSale
            compareAtPrice {
              ...MoneyFragment
            }
            price {
              ...MoneyFragment
            }
            requiresShipping
            title
            image {
              ...ImageFragment
            }
            product {
              handle
              title
              id
            }
            selectedOptions {
              name
              value
            }
          }
        }
      }
    }
  }
  cost {
    subtotalAmount {
      ...MoneyFragment
    }
    totalAmount {
      ...MoneyFragment
    }
    totalDutyAmount {
      ...MoneyFragment
    }
    totalTaxAmount {
      ...MoneyFragment
    }
  }
  note
  attributes {
    key
    value
  }
  discountCodes {
    code
  }
}

fragment MoneyFragment on MoneyV2 {
  currencyCode
  amount
}

fragment ImageFragment on Image {
  id
  url
  altText
  width
  height
}"#;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutData {
    pub shop: Shop,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Shop {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductData {
    pub product: Option<Product>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    /// Merchant-authored HTML, rendered unescaped.
    #[serde(default)]
    pub description_html: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartData {
    pub cart: Option<Cart>,
}

/// The subset of the cart fragment the layout renders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: String,
    #[serde(default)]
    pub checkout_url: Option<String>,
    #[serde(default)]
    pub total_quantity: u32,
    #[serde(default)]
    pub cost: Option<CartCost>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartCost {
    pub total_amount: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

impl Money {
    pub fn format(&self) -> String {
        format!("{} {}", self.amount, self.currency_code)
    }
}
