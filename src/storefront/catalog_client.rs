use std::time::Duration;

use tracing::{info, warn};

use crate::handlers::catalog::ProductsResponse;
use crate::models::{fallback_menu, Product};

pub const OFFLINE_NOTICE: &str = "Using offline menu data";

/// Where the storefront's menu came from.
#[derive(Debug, Clone, PartialEq)]
pub enum MenuLoad {
    Remote(Vec<Product>),
    /// Built-in menu, shown with `notice`.
    Offline { products: Vec<Product>, notice: String },
}

impl MenuLoad {
    pub fn products(&self) -> &[Product] {
        match self {
            MenuLoad::Remote(products) | MenuLoad::Offline { products, .. } => products,
        }
    }

    pub fn notice(&self) -> Option<&str> {
        match self {
            MenuLoad::Remote(_) => None,
            MenuLoad::Offline { notice, .. } => Some(notice),
        }
    }

    fn offline() -> Self {
        MenuLoad::Offline {
            products: fallback_menu(),
            notice: OFFLINE_NOTICE.to_string(),
        }
    }
}

pub struct CatalogClient {
    client: reqwest::Client,
    products_url: String,
}

impl CatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: crate::providers::http_client(timeout)?,
            products_url: format!("{}/api/v1/products", base_url.trim_end_matches('/')),
        })
    }

    /// Never fails: any fetch problem or an empty menu yields the offline menu.
    pub async fn load(&self) -> MenuLoad {
        match self.fetch().await {
            Ok(products) if !products.is_empty() => {
                info!(count = products.len(), "Loaded menu from API");
                MenuLoad::Remote(products)
            }
            Ok(_) => {
                warn!(url = %self.products_url, "API returned an empty menu");
                MenuLoad::offline()
            }
            Err(e) => {
                warn!(url = %self.products_url, error = %e, "Menu fetch failed");
                MenuLoad::offline()
            }
        }
    }

    async fn fetch(&self) -> Result<Vec<Product>, reqwest::Error> {
        let body: ProductsResponse = self
            .client
            .get(&self.products_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(if body.success { body.products } else { Vec::new() })
    }
}
