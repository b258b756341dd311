//! Navigation controller: owns the browsing surface and its filter wiring.
//!
//! Both constructors install the interceptor and the guard before handing
//! the surface out, so no navigation can start unfiltered.

use adshield::{ContentShield, InterceptStatsSnapshot};
use anyhow::{Context, Result};

use crate::keyboard::{KeyCommand, KeyboardBridge};
use crate::renderer::{NavigationResult, RenderContext, Renderer};

/// Drives one filtered browsing surface.
pub struct NavigationController {
    context: Box<dyn RenderContext>,
    shield: ContentShield,
    timeout_ms: u64,
    /// Present only while the on-screen keyboard is open.
    keyboard: Option<KeyboardBridge>,
    navigations: u64,
}

impl NavigationController {
    /// Create a surface on `renderer` with filtering installed.
    pub async fn open(
        renderer: &dyn Renderer,
        shield: ContentShield,
        timeout_ms: u64,
    ) -> Result<Self> {
        let context = renderer
            .new_context()
            .await
            .context("failed to create browsing surface")?;
        Self::with_context(context, shield, timeout_ms).await
    }

    /// Wrap an existing surface, installing filtering on it first.
    pub async fn with_context(
        mut context: Box<dyn RenderContext>,
        shield: ContentShield,
        timeout_ms: u64,
    ) -> Result<Self> {
        context
            .install_interceptor(shield.interceptor())
            .await
            .context("failed to install request interceptor")?;
        context
            .install_guard(shield.injector())
            .await
            .context("failed to install guard script")?;

        Ok(Self {
            context,
            shield,
            timeout_ms,
            keyboard: None,
            navigations: 0,
        })
    }

    /// Start a new navigation session.
    pub async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        self.navigations += 1;
        tracing::info!(url, session = self.navigations, "navigating");
        let result = self.context.navigate(url, self.timeout_ms).await?;
        tracing::info!(
            final_url = %result.final_url,
            load_time_ms = result.load_time_ms,
            "navigation completed"
        );
        Ok(result)
    }

    pub async fn current_url(&self) -> Result<String> {
        self.context.get_url().await
    }

    pub fn shield(&self) -> &ContentShield {
        &self.shield
    }

    pub fn stats(&self) -> InterceptStatsSnapshot {
        self.shield.interceptor().stats()
    }

    pub fn navigations(&self) -> u64 {
        self.navigations
    }

    /// Open the keyboard, or return the one already open.
    pub fn show_keyboard(&mut self) -> &mut KeyboardBridge {
        self.keyboard.get_or_insert_with(KeyboardBridge::default)
    }

    /// Close the keyboard. Returns whether one was open.
    pub fn close_keyboard(&mut self) -> bool {
        self.keyboard.take().is_some()
    }

    pub fn keyboard(&self) -> Option<&KeyboardBridge> {
        self.keyboard.as_ref()
    }

    /// Forward one on-screen keyboard key to the page's search box.
    pub async fn send_key(&mut self, key: &str) -> Result<()> {
        self.send_command(KeyCommand::from_key(key)).await
    }

    /// Apply one decoded key press to the page's search box.
    pub async fn send_command(&mut self, command: KeyCommand) -> Result<()> {
        let script = self.show_keyboard().script_for_command(&command);
        self.context
            .execute_js(&script)
            .await
            .context("failed to forward key")?;
        Ok(())
    }

    /// Close the surface.
    pub async fn close(self) -> Result<()> {
        let stats = self.stats();
        tracing::info!(
            allowed = stats.allowed,
            blocked = stats.blocked,
            faults = stats.faults,
            "closing browsing surface"
        );
        self.context.close().await
    }
}
