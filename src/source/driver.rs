// src/source/driver.rs
//! Page-fetching capability used by browser-backed sources.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::{OsStr, OsString};
use std::sync::Arc;
use std::time::{Duration, Instant as StdInstant};
use tokio::sync::{Mutex, OnceCell};
use tokio::time::Instant;

/// Extra slack on top of a browser-side timeout before the blocking call is
/// abandoned from the async side.
const GRACE: Duration = Duration::from_secs(5);
const SCROLL_JS: &str = "window.scrollTo(0, document.body.scrollHeight)";

#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()>;

    async fn scroll_to_bottom(&self) -> Result<()>;

    /// Current page HTML.
    async fn content(&self) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub user_agent: Option<String>,
    pub idle_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: true,
            user_agent: None,
            idle_timeout: Duration::from_secs(120),
        }
    }
}

struct ChromeSession {
    // Dropping the browser kills the process; keep it alive with the tab.
    _browser: Browser,
    tab: Serialized<Arc<Tab>>,
}

impl ChromeSession {
    fn launch(opts: &ChromeOptions) -> Result<Self> {
        let ua_arg = opts
            .user_agent
            .as_ref()
            .map(|ua| OsString::from(format!("--user-agent={ua}")));

        let mut args: Vec<&OsStr> = vec![OsStr::new("--disable-blink-features=AutomationControlled")];
        if let Some(a) = &ua_arg {
            args.push(a.as_os_str());
        }

        let browser = Browser::new(LaunchOptions {
            headless: opts.headless,
            args,
            idle_browser_timeout: opts.idle_timeout,
            ..Default::default()
        })
        .context("launching headless chrome")?;
        let tab = browser.new_tab().context("opening browser tab")?;

        Ok(Self {
            _browser: browser,
            tab: Serialized::new(tab, GRACE),
        })
    }
}

/// A value driven from the blocking pool by one call at a time.
///
/// The lock guard moves into the blocking task, so a call the async side has
/// given up on keeps the value locked until its blocking work returns.
struct Serialized<T> {
    inner: Arc<Mutex<T>>,
    grace: Duration,
}

impl<T: Send + Sync + 'static> Serialized<T> {
    fn new(value: T, grace: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(value)),
            grace,
        }
    }

    /// Run `op` on the blocking pool. `op` receives what is left of `limit`
    /// after waiting for the lock and must finish within it.
    async fn run<R, F>(&self, limit: Duration, op: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&T, Duration) -> Result<R> + Send + 'static,
    {
        let started = Instant::now();
        let deadline = started + limit + self.grace;

        let guard = tokio::time::timeout_at(deadline, self.inner.clone().lock_owned())
            .await
            .map_err(|_| anyhow!("browser still busy after {:?}", limit + self.grace))?;
        let budget = limit.saturating_sub(started.elapsed());
        if budget.is_zero() {
            bail!("no time left for browser call after waiting {:?}", started.elapsed());
        }

        let task = tokio::task::spawn_blocking(move || op(&*guard, budget));
        match tokio::time::timeout_at(deadline, task).await {
            Ok(joined) => joined.map_err(|e| anyhow!("browser task failed: {e}"))?,
            Err(_) => bail!("browser call did not finish within {:?}", limit + self.grace),
        }
    }
}

/// One headless Chrome tab shared by every source, launched on first use.
pub struct ChromeDriver {
    options: ChromeOptions,
    session: OnceCell<ChromeSession>,
}

impl ChromeDriver {
    pub fn new(options: ChromeOptions) -> Self {
        Self {
            options,
            session: OnceCell::new(),
        }
    }

    async fn session(&self) -> Result<&ChromeSession> {
        self.session
            .get_or_try_init(|| async {
                let opts = self.options.clone();
                tracing::debug!(headless = opts.headless, "launching browser");
                tokio::task::spawn_blocking(move || ChromeSession::launch(&opts))
                    .await
                    .map_err(|e| anyhow!("browser launch task failed: {e}"))?
            })
            .await
    }

    async fn on_tab<T, F>(&self, limit: Duration, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab, Duration) -> Result<T> + Send + 'static,
    {
        let session = self.session().await?;
        session.tab.run(limit, move |tab, budget| op(&**tab, budget)).await
    }
}

#[async_trait]
impl PageDriver for ChromeDriver {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let url = url.to_string();
        self.on_tab(timeout, move |tab, budget| {
            let deadline = StdInstant::now() + budget;
            tab.set_default_timeout(budget);
            tab.navigate_to(&url)
                .with_context(|| format!("navigating to {url}"))?;

            let left = deadline.saturating_duration_since(StdInstant::now());
            if left.is_zero() {
                bail!("navigating to {url} used the whole {budget:?}");
            }
            tab.set_default_timeout(left);
            tab.wait_until_navigated()
                .with_context(|| format!("waiting for {url}"))?;
            Ok(())
        })
        .await
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<()> {
        let selector = selector.to_string();
        self.on_tab(timeout, move |tab, budget| {
            tab.wait_for_element_with_custom_timeout(&selector, budget)
                .map(|_| ())
                .with_context(|| format!("waiting for `{selector}`"))
        })
        .await
    }

    async fn scroll_to_bottom(&self) -> Result<()> {
        self.on_tab(Duration::from_secs(10), |tab, _| {
            tab.evaluate(SCROLL_JS, false).map(|_| ()).context("scrolling")
        })
        .await
    }

    async fn content(&self) -> Result<String> {
        self.on_tab(Duration::from_secs(30), |tab, _| {
            tab.get_content().context("reading page content")
        })
        .await
    }
}
