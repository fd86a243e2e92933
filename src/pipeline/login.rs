// src/pipeline/login.rs

//! Sign-in and page preparation before harvesting.

use crate::error::Result;
use crate::models::{Config, Credentials};
use crate::surface::{RenderSurface, scripts, wait_for_selector};

/// Sign in and open the target table page.
///
/// Fails when the login form or the table region does not appear within
/// their bounded waits.
pub async fn login_and_navigate(
    config: &Config,
    credentials: &Credentials,
    surface: &dyn RenderSurface,
) -> Result<()> {
    let site = &config.site;
    let page_timeout = config.surface.page_timeout();

    log::info!("Opening login page {}", site.login_url);
    surface.navigate(&site.login_url, page_timeout).await?;
    wait_for_selector(
        surface,
        &site.email_selector,
        config.surface.element_timeout(),
    )
    .await?;

    surface
        .fill_field(&site.email_selector, &credentials.email)
        .await?;
    surface
        .fill_field(&site.password_selector, &credentials.password)
        .await?;
    surface.click(&site.submit_selector).await?;
    log::info!("Credentials submitted");

    if !site.post_login_wait().is_zero() {
        tokio::time::sleep(site.post_login_wait()).await;
    }

    log::info!("Opening target page {}", site.target_url);
    surface.navigate(&site.target_url, page_timeout).await?;
    wait_for_selector(
        surface,
        &config.extraction.table_region,
        site.post_navigation_wait(),
    )
    .await?;

    log::info!("Table region is ready");
    Ok(())
}

/// Remove page elements matched by the configured prune selectors.
///
/// Pruning is cosmetic; failures are logged and ignored.
pub async fn prune_page(config: &Config, surface: &dyn RenderSurface) {
    for selector in &config.site.prune_selectors {
        match surface.evaluate_script(&scripts::remove_all(selector)).await {
            Ok(removed) => log::info!(
                "Removed {} element(s) matching {}",
                removed.as_u64().unwrap_or(0),
                selector
            ),
            Err(e) => log::warn!("Could not remove {}: {}", selector, e),
        }
    }
}
