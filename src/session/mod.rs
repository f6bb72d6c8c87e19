//! Browser session lifecycle: launch, health classification, rebuild.
//!
//! One `SessionManager` exclusively owns one live Chromium handle bound to a
//! persistent user profile. Collaborators borrow the page for the duration of
//! a single operation via [`SessionManager::page`] and must re-fetch it after
//! any call that may have triggered a rebuild; retaining a handle across a
//! rebuild is a correctness bug this module is designed to prevent.

pub mod chrome;
pub mod config;
pub mod input;
mod stealth;

use std::future::Future;
use std::path::PathBuf;

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub use config::BrowserSettings;
use stealth::STEALTH_SCRIPTS;

use crate::error::ScrapeError;
use crate::pacing::PacingScheduler;

/// Launch arguments that reduce automation fingerprinting.
const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--start-maximized",
];

/// Lifecycle state of the managed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Live,
    Degraded,
    Dead,
    Rebuilding,
}

/// One live browser instance plus the task draining its event stream.
struct LiveSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Page,
}

/// Owns the lifecycle of a single profile-backed browser automation handle.
pub struct SessionManager {
    settings: BrowserSettings,
    pacing: PacingScheduler,
    state: SessionState,
    live: Option<LiveSession>,
}

impl SessionManager {
    pub fn new(settings: BrowserSettings, pacing: PacingScheduler) -> Self {
        Self {
            settings,
            pacing,
            state: SessionState::Uninitialized,
            live: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pacing(&self) -> &PacingScheduler {
        &self.pacing
    }

    /// The current page handle. Valid only until the next rebuild; callers
    /// must not retain it across boundary-crossing calls.
    pub fn page(&self) -> Result<Page, ScrapeError> {
        match (&self.state, &self.live) {
            (SessionState::Live, Some(live)) => Ok(live.page.clone()),
            _ => Err(ScrapeError::NotConnected),
        }
    }

    /// Launch the browser bound to the configured user profile.
    pub async fn create(&mut self) -> Result<(), ScrapeError> {
        let live = launch(&self.settings).await?;
        self.live = Some(live);
        self.state = SessionState::Live;
        Ok(())
    }

    /// Record that the session failed in a way that requires recreation.
    pub fn mark_dead(&mut self) {
        self.state = SessionState::Dead;
    }

    /// Record a failure that did not kill the session.
    pub fn mark_degraded(&mut self) {
        if self.state == SessionState::Live {
            self.state = SessionState::Degraded;
        }
    }

    /// Quit the existing handle (best-effort, errors swallowed) and launch a
    /// fresh one, then apply the pacing scheduler's short delay so the caller
    /// does not resume instantly after a crash.
    pub async fn rebuild(&mut self) -> Result<(), ScrapeError> {
        warn!("rebuilding browser session");
        self.state = SessionState::Rebuilding;
        self.teardown().await;
        let live = launch(&self.settings).await?;
        self.live = Some(live);
        self.state = SessionState::Live;
        self.pacing.retry_delay().await;
        Ok(())
    }

    /// Shut the browser down cleanly. Errors are swallowed; the session ends
    /// either way.
    pub async fn quit(&mut self) {
        self.teardown().await;
        self.state = SessionState::Uninitialized;
    }

    async fn teardown(&mut self) {
        if let Some(mut live) = self.live.take() {
            if let Err(e) = live.browser.close().await {
                debug!("browser close failed (ignored): {e}");
            }
            live.handler.abort();
        }
    }
}

async fn launch(settings: &BrowserSettings) -> Result<LiveSession, ScrapeError> {
    let chrome = chrome::find_chrome(settings.chrome_binary.as_deref())?;

    let mut builder = BrowserConfig::builder().chrome_executable(chrome);

    // with_head means NOT headless, confusingly
    if !settings.headless {
        builder = builder.with_head();
    }

    if let Some(dir) = &settings.profile_dir {
        let expanded = shellexpand::full(dir)
            .map_err(|e| ScrapeError::Launch(format!("profile path expansion: {e}")))?;
        let path = PathBuf::from(expanded.as_ref());
        if !path.exists() {
            return Err(ScrapeError::Launch(format!(
                "user profile directory does not exist: {}",
                path.display()
            )));
        }
        builder = builder.user_data_dir(path);
    }
    if let Some(name) = &settings.profile_name {
        builder = builder.arg(format!("--profile-directory={name}"));
    }

    for arg in STEALTH_ARGS {
        builder = builder.arg(*arg);
    }
    for arg in &settings.chrome_args {
        builder = builder.arg(arg);
    }

    let config = builder
        .build()
        .map_err(|e| ScrapeError::Launch(format!("browser config: {e}")))?;

    info!("Launching browser (headless={})", settings.headless);
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| ScrapeError::Launch(e.to_string()))?;

    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    check_browser_version(&browser, settings.major_version).await;

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(ScrapeError::from_cdp)?;

    // Installed on every new document so they survive navigations.
    for script in STEALTH_SCRIPTS {
        let params = AddScriptToEvaluateOnNewDocumentParams::builder()
            .source(*script)
            .build()
            .map_err(|e| ScrapeError::Launch(format!("stealth script params: {e}")))?;
        if let Err(e) = page.execute(params).await {
            debug!("stealth script injection skipped: {e}");
        }
    }

    Ok(LiveSession {
        browser,
        handler: handler_task,
        page,
    })
}

/// Compare the configured major version against what the launched browser
/// reports. The protocol has no driver binary to mismatch, but a drifted
/// browser install is the usual cause of selector and input breakage, so the
/// expectation lives in configuration and is verified here.
async fn check_browser_version(browser: &Browser, expected: Option<u32>) {
    let Some(expected) = expected else { return };
    match browser.version().await {
        Ok(version) => match chrome::parse_major_version(&version.product) {
            Some(actual) if actual == expected => {
                debug!("browser major version {actual} matches configuration");
            }
            Some(actual) => {
                warn!(
                    "browser major version {actual} differs from configured {expected}; \
                     update browser.major_version after verifying selectors"
                );
            }
            None => debug!("could not parse browser version from {:?}", version.product),
        },
        Err(e) => debug!("browser version query failed: {e}"),
    }
}

/// What the recovery loop should do with a failed attempt.
#[derive(Debug)]
enum RecoveryAction {
    /// Rebuild the session, then retry exactly once.
    Rebuild,
    /// Retry after a pacing delay.
    RetryTransient,
    /// Out of options; re-raise.
    Propagate(ScrapeError),
}

/// Pure retry bookkeeping for [`run_with_recovery`]: a dead session earns
/// one rebuild with one retry after it, a transient failure earns up to
/// `max_transient_retries` retries, and anything after the rebuild
/// propagates.
#[derive(Debug)]
struct RecoveryPolicy {
    max_transient_retries: u32,
    transient_attempts: u32,
    rebuilt: bool,
}

impl RecoveryPolicy {
    fn new(max_transient_retries: u32) -> Self {
        Self {
            max_transient_retries,
            transient_attempts: 0,
            rebuilt: false,
        }
    }

    fn decide(&mut self, err: ScrapeError) -> RecoveryAction {
        match err {
            ScrapeError::DeadSession(_) if !self.rebuilt => {
                self.rebuilt = true;
                // After the rebuild only the single retry remains.
                self.transient_attempts = self.max_transient_retries;
                RecoveryAction::Rebuild
            }
            ScrapeError::Transient(_) if self.transient_attempts < self.max_transient_retries => {
                self.transient_attempts += 1;
                RecoveryAction::RetryTransient
            }
            other => RecoveryAction::Propagate(other),
        }
    }
}

/// Run `op` against the current page with rebuild-on-dead recovery.
///
/// Transient failures retry up to `max_transient_retries` times with a pacing
/// delay between attempts, re-raising the last error after exhaustion. A dead
/// session triggers exactly one rebuild and one retry on the new handle; any
/// failure after that propagates. The operation receives a fresh page clone on
/// every attempt, so it can never act on a stale handle.
pub async fn run_with_recovery<T, F, Fut>(
    session: &mut SessionManager,
    max_transient_retries: u32,
    mut op: F,
) -> Result<T, ScrapeError>
where
    F: FnMut(Page) -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    let mut policy = RecoveryPolicy::new(max_transient_retries);

    loop {
        let page = session.page()?;
        let err = match op(page).await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        match policy.decide(err) {
            RecoveryAction::Rebuild => {
                warn!("session dead; rebuilding and retrying once");
                session.mark_dead();
                session.rebuild().await?;
            }
            RecoveryAction::RetryTransient => {
                session.mark_degraded();
                warn!(
                    "transient failure; retrying {}/{}",
                    policy.transient_attempts, policy.max_transient_retries
                );
                session.pacing().retry_delay().await;
            }
            RecoveryAction::Propagate(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dead() -> ScrapeError {
        ScrapeError::DeadSession("gone".into())
    }

    fn transient() -> ScrapeError {
        ScrapeError::Transient("flaky".into())
    }

    #[test]
    fn page_unavailable_before_create() {
        let manager = SessionManager::new(
            BrowserSettings::default(),
            PacingScheduler::new(crate::pacing::PacingSettings::default()),
        );
        assert_eq!(manager.state(), SessionState::Uninitialized);
        assert!(matches!(manager.page(), Err(ScrapeError::NotConnected)));
    }

    #[test]
    fn dead_session_gets_exactly_one_rebuild() {
        let mut policy = RecoveryPolicy::new(2);
        assert!(matches!(policy.decide(dead()), RecoveryAction::Rebuild));
        // The retry after the rebuild failed dead again: propagate.
        assert!(matches!(
            policy.decide(dead()),
            RecoveryAction::Propagate(ScrapeError::DeadSession(_))
        ));
    }

    #[test]
    fn no_transient_retries_remain_after_a_rebuild() {
        let mut policy = RecoveryPolicy::new(2);
        assert!(matches!(policy.decide(dead()), RecoveryAction::Rebuild));
        assert!(matches!(
            policy.decide(transient()),
            RecoveryAction::Propagate(ScrapeError::Transient(_))
        ));
    }

    #[test]
    fn transient_retries_are_bounded() {
        let mut policy = RecoveryPolicy::new(2);
        assert!(matches!(
            policy.decide(transient()),
            RecoveryAction::RetryTransient
        ));
        assert!(matches!(
            policy.decide(transient()),
            RecoveryAction::RetryTransient
        ));
        assert!(matches!(
            policy.decide(transient()),
            RecoveryAction::Propagate(ScrapeError::Transient(_))
        ));
    }

    #[test]
    fn rebuild_is_still_available_after_transient_retries() {
        let mut policy = RecoveryPolicy::new(1);
        assert!(matches!(
            policy.decide(transient()),
            RecoveryAction::RetryTransient
        ));
        assert!(matches!(policy.decide(dead()), RecoveryAction::Rebuild));
    }

    #[test]
    fn non_recoverable_errors_propagate_immediately() {
        let mut policy = RecoveryPolicy::new(3);
        assert!(matches!(
            policy.decide(ScrapeError::LoginRequired),
            RecoveryAction::Propagate(ScrapeError::LoginRequired)
        ));
    }
}
