//! Reliable navigation on a hostile surface: timeout-tolerant page loads,
//! login-wall detection, and direct-URL / search fallback product resolution.

pub mod config;
mod js;

use std::time::Duration;

use chromiumoxide::Page;
use console::style;
use serde::Deserialize;
use tracing::{debug, info, warn};

pub use config::{DetectionSettings, NavigationSettings};

use crate::error::ScrapeError;
use crate::models::ProductTarget;
use crate::pacing::PacingScheduler;
use crate::session::{input, run_with_recovery, SessionManager};

/// Drives the browser to target pages, rebuilding the session mid-flight when
/// it dies. Holds no page handle; every operation re-fetches the current one
/// from the session manager.
pub struct Navigator {
    settings: NavigationSettings,
    detection: DetectionSettings,
    pacing: PacingScheduler,
}

#[derive(Debug, Deserialize)]
struct ButtonProbe {
    x: Option<f64>,
    y: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultLink {
    found: bool,
    count: Option<u32>,
    href: Option<String>,
    #[allow(dead_code)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginHit {
    hit: Option<String>,
}

impl Navigator {
    pub fn new(
        settings: NavigationSettings,
        detection: DetectionSettings,
        pacing: PacingScheduler,
    ) -> Self {
        Self {
            settings,
            detection,
            pacing,
        }
    }

    /// Navigate to `url` with timeout handling, bounded transient retries,
    /// and rebuild-on-dead recovery.
    ///
    /// A page-load timeout is not a failure: loading is stopped and the
    /// explicit waits downstream take over. A dead session rebuilds once and
    /// retries once; a transient error retries up to the configured ceiling
    /// with a pacing delay in between.
    pub async fn safe_get(
        &self,
        session: &mut SessionManager,
        url: &str,
    ) -> Result<(), ScrapeError> {
        let deadline = Duration::from_secs(self.settings.page_timeout_secs);
        let target = url.to_string();

        run_with_recovery(session, self.settings.nav_retries, move |page| {
            let target = target.clone();
            async move {
                debug!("navigating to {target}");
                let outcome = match tokio::time::timeout(deadline, page.goto(target.clone())).await
                {
                    Err(_) => Err(ScrapeError::Timeout(format!(
                        "page load exceeded {}s for {target}",
                        deadline.as_secs()
                    ))),
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(e)) => Err(ScrapeError::from_cdp(e)),
                };
                match outcome {
                    Err(ScrapeError::Timeout(msg)) => {
                        debug!("{msg}; stopping load and proceeding");
                        let _ = page.evaluate("window.stop();").await;
                        Ok(())
                    }
                    other => other,
                }
            }
        })
        .await
    }

    /// Load the authenticated order-list surface and wait for it to settle.
    pub async fn open_order_list(&self, session: &mut SessionManager) -> Result<(), ScrapeError> {
        let url = self.settings.order_list_url.clone();
        info!("Navigating to order list");
        self.safe_get(session, &url).await?;
        let page = session.page()?;
        wait_for_page_ready(&page, self.settings.page_timeout_secs).await;
        self.pacing.delay(2.0, 5.0).await;
        Ok(())
    }

    /// Verify the operator is logged in, prompting once if a login wall is
    /// detected. Returns false only if the wall persists after the prompt
    /// cycle; this is a blocking, user-facing flow and is never silently
    /// retried beyond that.
    pub async fn check_login(&self, session: &mut SessionManager) -> Result<bool, ScrapeError> {
        self.open_order_list(session).await?;
        self.pacing.delay(8.0, 15.0).await;

        if !self.login_wall_detected(session).await? {
            info!("target site is logged in");
            return Ok(true);
        }

        warn!("login wall detected on authenticated surface");
        eprintln!();
        eprintln!("{}", style("=".repeat(60)).yellow());
        eprintln!(
            "{}",
            style("Target site is NOT logged in.").yellow().bold()
        );
        eprintln!("Please log in manually in the browser window.");
        eprintln!("(If a CAPTCHA keeps failing, log in once in a normal browser first.)");
        eprintln!("{}", style("=".repeat(60)).yellow());
        eprintln!();

        // One re-check after the operator had a chance to act.
        self.open_order_list(session).await?;
        self.pacing.delay(4.0, 8.0).await;

        if self.quick_login_signals(session).await {
            warn!("login wall persists after prompt");
            return Ok(false);
        }
        info!("login wall cleared");
        Ok(true)
    }

    /// Cheap, side-effect-free mid-run check for an unexpected logout: URL
    /// marker plus page-source substrings only. Probe errors read as "not
    /// expired" so this never interrupts a healthy run.
    pub async fn check_session_expired(&self, session: &SessionManager) -> bool {
        self.quick_login_signals(session).await
    }

    async fn quick_login_signals(&self, session: &SessionManager) -> bool {
        let Ok(page) = session.page() else {
            return false;
        };
        if let Ok(Some(url)) = page.url().await {
            if self.detection.url_marks_login(&url) {
                debug!("login marker in URL: {url}");
                return true;
            }
        }
        match page.content().await {
            Ok(source) => self.detection.source_marks_login(&source),
            Err(_) => false,
        }
    }

    /// Full login-wall detection: form selectors in the main document and
    /// every same-origin iframe, URL markers, and page-source markers.
    async fn login_wall_detected(&self, session: &SessionManager) -> Result<bool, ScrapeError> {
        let page = session.page()?;

        let probe: LoginHit = page
            .evaluate(js::login_probe_script(&self.detection.login_form_selectors))
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or(LoginHit { hit: None });
        if let Some(scope) = probe.hit {
            debug!("login form control found in {scope}");
            return Ok(true);
        }

        if let Ok(Some(url)) = page.url().await {
            if self.detection.url_marks_login(&url) {
                debug!("login marker in URL: {url}");
                return Ok(true);
            }
        }

        if let Ok(source) = page.content().await {
            if self.detection.source_marks_login(&source) {
                debug!("login markup found in page source");
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Get onto the product page for `target`: direct URL when known and
    /// verified by a product-page anchor, otherwise order-list search.
    /// Returns false only when both strategies fail.
    pub async fn navigate_to_product(
        &self,
        session: &mut SessionManager,
        target: &ProductTarget,
    ) -> Result<bool, ScrapeError> {
        if let Some(url) = &target.url {
            debug!("trying direct product URL");
            self.safe_get(session, url).await?;
            self.pacing.delay(3.0, 6.0).await;

            if self.check_session_expired(session).await {
                debug!("session expired during direct navigation; trying search fallback");
            } else if self.on_product_page(session).await? {
                info!("direct URL navigation successful");
                return Ok(true);
            } else {
                debug!("direct URL loaded without product anchors; trying search fallback");
            }
        }

        debug!("falling back to order-list search: {}", target.search_term);
        self.open_order_list(session).await?;
        if self.check_session_expired(session).await {
            warn!("session expired on order list; cannot search");
            return Ok(false);
        }
        if !self.search_product(session, &target.search_term).await? {
            return Ok(false);
        }
        self.click_first_result(session).await
    }

    async fn on_product_page(&self, session: &SessionManager) -> Result<bool, ScrapeError> {
        let page = session.page()?;
        let present: bool = page
            .evaluate(js::PRODUCT_ANCHOR_PROBE)
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or(false);
        Ok(present)
    }

    /// Submit a keyword search through the shadow-nested search widget.
    /// Fails closed with a log of whichever shadow layer was missing.
    pub async fn search_product(
        &self,
        session: &mut SessionManager,
        term: &str,
    ) -> Result<bool, ScrapeError> {
        info!("Searching for: {term}");

        let mut booted = false;
        for _ in 0..self.settings.app_root_wait_iterations {
            let page = session.page()?;
            let count: u64 = page
                .evaluate(js::APP_ROOT_COUNT)
                .await
                .map_err(ScrapeError::from_cdp)?
                .into_value()
                .unwrap_or(0);
            if count > 0 {
                booted = true;
                break;
            }
            self.pacing.delay(0.8, 1.5).await;
        }
        if !booted {
            warn!("search application root never appeared");
            return Ok(false);
        }

        // Nested shadow roots render a while after the root exists.
        self.pacing.delay(4.0, 8.0).await;

        let page = session.page()?;
        let focus: String = page
            .evaluate(js::focus_search_input_script())
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or_else(|_| "FAIL: no result from focus script".to_string());
        if focus != "SUCCESS" {
            warn!("could not focus search input: {focus}");
            return Ok(false);
        }

        // The focus script selected the existing text; Backspace clears it.
        self.pacing.delay(0.3, 0.8).await;
        input::press_backspace(&page).await?;
        input::type_text(&page, &self.pacing, term).await?;
        self.pacing.delay(0.8, 2.0).await;

        let probe: ButtonProbe = page
            .evaluate(js::search_submit_probe_script())
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or(ButtonProbe {
                x: None,
                y: None,
                error: Some("no result from submit probe".into()),
            });
        let (x, y) = match (probe.x, probe.y) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                warn!(
                    "could not locate search button: {}",
                    probe.error.unwrap_or_else(|| "unknown".into())
                );
                return Ok(false);
            }
        };

        input::human_move_and_click(&page, &self.pacing, x, y, true).await?;
        self.pacing.delay(2.0, 5.0).await;
        Ok(true)
    }

    /// Open the first result link by navigating to its href; dispatching a
    /// click on a nested shadow anchor is unreliable across site versions.
    /// Retries once with a longer wait when no results are present yet.
    pub async fn click_first_result(
        &self,
        session: &mut SessionManager,
    ) -> Result<bool, ScrapeError> {
        self.pacing.delay(2.0, 5.0).await;

        let mut link = self.first_result(session).await?;
        if link.is_none() {
            debug!("no result links yet; retrying with a longer wait");
            self.pacing.delay(4.0, 8.0).await;
            link = self.first_result(session).await?;
        }

        let Some((href, count)) = link else {
            warn!("no result links found");
            return Ok(false);
        };

        info!("Opening first of {count} result(s)");
        self.safe_get(session, &href).await?;
        self.pacing.delay(2.0, 5.0).await;
        Ok(true)
    }

    async fn first_result(
        &self,
        session: &SessionManager,
    ) -> Result<Option<(String, u32)>, ScrapeError> {
        let page = session.page()?;
        let result: ResultLink = page
            .evaluate(js::first_result_script())
            .await
            .map_err(ScrapeError::from_cdp)?
            .into_value()
            .unwrap_or(ResultLink {
                found: false,
                count: None,
                href: None,
                text: None,
            });
        if !result.found {
            return Ok(None);
        }
        Ok(result
            .href
            .map(|href| (href, result.count.unwrap_or(1))))
    }
}

/// Wait for the document to reach a usable ready state, bounded by the page
/// timeout. Failure here is informational; the caller proceeds either way.
async fn wait_for_page_ready(page: &Page, timeout_secs: u64) {
    const READY_SCRIPT: &str = r#"
        new Promise((resolve) => {
            if (document.readyState === 'complete' || document.readyState === 'interactive') {
                resolve(document.readyState);
            } else {
                document.addEventListener('DOMContentLoaded', () => resolve(document.readyState));
                setTimeout(() => resolve('timeout'), 10000);
            }
        })
    "#;

    match tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        page.evaluate(READY_SCRIPT.to_string()),
    )
    .await
    {
        Ok(Ok(result)) => {
            let state: String = result
                .into_value()
                .unwrap_or_else(|_| "unknown".to_string());
            debug!("Page ready state: {state}");
        }
        Ok(Err(e)) => debug!("Could not check ready state: {e}"),
        Err(_) => warn!("Timeout waiting for page ready state"),
    }
}
