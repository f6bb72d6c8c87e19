//! Humanized pointer and keyboard input over the CDP Input domain.
//!
//! Target sites distinguish scripted clicks from pointer-simulated ones, so
//! interactive steps dispatch trusted input events with positional jitter and
//! randomized timing instead of calling `element.click()` in page JS.

use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType, MouseButton,
};
use chromiumoxide::Page;
use rand::Rng;

use crate::error::ScrapeError;
use crate::pacing::PacingScheduler;

/// Maximum positional jitter in CSS pixels, applied on both axes.
const CLICK_JITTER_PX: i32 = 3;

fn jittered(coord: f64) -> f64 {
    coord + rand::rng().random_range(-CLICK_JITTER_PX..=CLICK_JITTER_PX) as f64
}

fn mouse_event(
    kind: DispatchMouseEventType,
    x: f64,
    y: f64,
    with_button: bool,
) -> Result<DispatchMouseEventParams, ScrapeError> {
    let mut builder = DispatchMouseEventParams::builder()
        .r#type(kind)
        .x(x)
        .y(y);
    if with_button {
        builder = builder.button(MouseButton::Left).click_count(1);
    }
    builder
        .build()
        .map_err(|e| ScrapeError::Transient(format!("mouse event build: {e}")))
}

/// Move the pointer to `(x, y)` with slight jitter and optionally click.
pub async fn human_move_and_click(
    page: &Page,
    pacing: &PacingScheduler,
    x: f64,
    y: f64,
    click: bool,
) -> Result<(), ScrapeError> {
    let (tx, ty) = (jittered(x), jittered(y));

    page.execute(mouse_event(DispatchMouseEventType::MouseMoved, tx, ty, false)?)
        .await
        .map_err(ScrapeError::from_cdp)?;

    if click {
        pacing.delay(0.05, 0.2).await;
        page.execute(mouse_event(DispatchMouseEventType::MousePressed, tx, ty, true)?)
            .await
            .map_err(ScrapeError::from_cdp)?;
        page.execute(mouse_event(DispatchMouseEventType::MouseReleased, tx, ty, true)?)
            .await
            .map_err(ScrapeError::from_cdp)?;
    }

    Ok(())
}

fn key_event(
    kind: DispatchKeyEventType,
    key: &str,
    code: &str,
    vk: i64,
) -> Result<DispatchKeyEventParams, ScrapeError> {
    DispatchKeyEventParams::builder()
        .r#type(kind)
        .key(key)
        .code(code)
        .windows_virtual_key_code(vk)
        .native_virtual_key_code(vk)
        .build()
        .map_err(|e| ScrapeError::Transient(format!("key event build: {e}")))
}

/// Press Backspace once. With the field's text selected (the focus scripts
/// call `select()`), this clears the whole field.
pub async fn press_backspace(page: &Page) -> Result<(), ScrapeError> {
    page.execute(key_event(
        DispatchKeyEventType::RawKeyDown,
        "Backspace",
        "Backspace",
        8,
    )?)
    .await
    .map_err(ScrapeError::from_cdp)?;
    page.execute(key_event(
        DispatchKeyEventType::KeyUp,
        "Backspace",
        "Backspace",
        8,
    )?)
    .await
    .map_err(ScrapeError::from_cdp)?;
    Ok(())
}

/// Type text into the focused element one character at a time with humanized
/// inter-key delays.
pub async fn type_text(
    page: &Page,
    pacing: &PacingScheduler,
    text: &str,
) -> Result<(), ScrapeError> {
    for ch in text.chars() {
        let params = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::Char)
            .text(ch.to_string())
            .build()
            .map_err(|e| ScrapeError::Transient(format!("key event build: {e}")))?;
        page.execute(params).await.map_err(ScrapeError::from_cdp)?;
        pacing.delay(0.03, 0.12).await;
    }
    Ok(())
}
