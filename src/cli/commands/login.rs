//! `skua login` - verify the storefront session.

use anyhow::bail;
use console::style;

use crate::config::Settings;
use crate::navigation::Navigator;
use crate::pacing::PacingScheduler;
use crate::session::SessionManager;

pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    let pacing = PacingScheduler::new(settings.pacing.clone());
    let mut session = SessionManager::new(settings.browser.clone(), pacing.clone());
    session.create().await?;

    let navigator = Navigator::new(
        settings.navigation.clone(),
        settings.detection.clone(),
        pacing,
    );
    let logged_in = navigator.check_login(&mut session).await;
    session.quit().await;

    if logged_in? {
        println!("{} storefront session is logged in", style("✓").green());
        Ok(())
    } else {
        bail!("login wall persists; log in manually in the profile browser and retry")
    }
}
