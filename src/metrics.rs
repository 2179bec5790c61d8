//! Prometheus metrics for the real-time layer and the message write path.

use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub struct Metrics {
    registry: Registry,
    /// Users with an identified connection. Sampled from the registry at scrape time.
    pub ws_connections: IntGauge,
    /// Dispatch attempts by outcome: delivered, absent, dropped.
    pub ws_dispatch: IntCounterVec,
    pub messages_created: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let ws_connections = IntGauge::new("ws_connections", "Identified WebSocket connections")?;
        let ws_dispatch = IntCounterVec::new(
            Opts::new("ws_dispatch_total", "new_message dispatch attempts by outcome"),
            &["outcome"],
        )?;
        let messages_created = IntCounter::new("messages_created_total", "Direct messages persisted")?;
        registry.register(Box::new(ws_connections.clone()))?;
        registry.register(Box::new(ws_dispatch.clone()))?;
        registry.register(Box::new(messages_created.clone()))?;
        Ok(Self {
            registry,
            ws_connections,
            ws_dispatch,
            messages_created,
        })
    }

    /// Render all metrics in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
