// C6: the ~1Hz driver that advances every powered-on room's thermal
// state and re-runs the schedule pass, independent of any inbound
// request.
use tokio::time::{self, Duration};
use tracing::debug;

use crate::engine::Engine;

const TICK_PERIOD: Duration = Duration::from_millis(1000);

pub fn spawn(engine: Engine) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(TICK_PERIOD);
        loop {
            interval.tick().await;
            debug!("ticker: driving engine.tick()");
            engine.tick().await;
        }
    })
}
