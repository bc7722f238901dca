pub mod cron;
pub mod server;

use tokio::time::{Instant, sleep};

use crate::{prelude::*, state::AppState};

/// Long-running part of the service, restarted by [`App`] when it exits.
#[async_trait]
pub trait Plugin: Send + Sync {
  fn name(&self) -> &'static str {
    std::any::type_name::<Self>()
  }

  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()>;
}

/// Restart delay that doubles after each quick failure and resets once a
/// run stayed up for `healthy`.
#[derive(Debug, Clone)]
pub struct Backoff {
  base: Duration,
  max: Duration,
  healthy: Duration,
  current: Duration,
}

impl Backoff {
  pub fn new(base: Duration, max: Duration, healthy: Duration) -> Self {
    Self { base, max, healthy, current: base }
  }

  /// Delay before the next start, given how long the last run lasted.
  pub fn next(&mut self, uptime: Duration) -> Duration {
    if uptime >= self.healthy {
      self.current = self.base;
    }
    let delay = self.current;
    self.current = (self.current * 2).min(self.max);
    delay
  }
}

impl Default for Backoff {
  fn default() -> Self {
    Self::new(
      Duration::from_secs(5),
      Duration::from_secs(120),
      Duration::from_secs(300),
    )
  }
}

/// Supervises plugins, restarting any that stop or crash.
pub struct App {
  plugins: Vec<Arc<dyn Plugin>>,
}

impl App {
  pub fn new() -> Self {
    Self { plugins: Vec::new() }
  }

  pub fn register<P: Plugin + 'static>(mut self, plugin: P) -> Self {
    self.plugins.push(Arc::new(plugin));
    self
  }

  pub async fn run(self, app: Arc<AppState>) {
    let handles = self.plugins.into_iter().map(|plugin| {
      let app = app.clone();
      tokio::spawn(supervise(plugin, app))
    });

    futures::future::join_all(handles).await;
  }
}

async fn supervise(plugin: Arc<dyn Plugin>, app: Arc<AppState>) {
  let name = plugin.name();
  let mut backoff = Backoff::default();
  info!(plugin = name, "Plugin started");

  loop {
    let started = Instant::now();
    let run = {
      let (plugin, app) = (plugin.clone(), app.clone());
      tokio::spawn(async move { plugin.start(app).await })
    };

    match run.await {
      Ok(Ok(())) => warn!(plugin = name, "Plugin returned, restarting"),
      Ok(Err(err)) => error!(plugin = name, "Plugin failed: {err:#}"),
      Err(err) if err.is_cancelled() => {
        info!(plugin = name, "Plugin cancelled");
        break;
      }
      Err(_) => error!(plugin = name, "Plugin panicked"),
    }

    let delay = backoff.next(started.elapsed());
    debug!(plugin = name, ?delay, "Waiting before restart");
    sleep(delay).await;
  }
}
