use crate::{plugins::Plugin, prelude::*, state::AppState};

/// Evicts expired login sessions once a minute.
pub struct SessionGc;

#[async_trait]
impl Plugin for SessionGc {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let mut interval = time::interval(Duration::from_secs(60));
    loop {
      interval.tick().await;

      let before = app.sessions.len();
      app.gc_sessions();
      let evicted = before.saturating_sub(app.sessions.len());
      if evicted > 0 {
        debug!("Evicted {evicted} expired sessions");
      }
    }
  }
}
