use chrono::Local;
use packetflow_core::api::{OutputRendererPlugin, RenderEvent};
use serde_json::{json, Value};

/// One JSON object per line: `{"v":1, "event_type", "ts", ...event fields}`.
pub struct JsonlRendererPlugin {
    pretty_print: bool,
}

impl JsonlRendererPlugin {
    pub fn new(pretty_print: bool) -> Self {
        Self { pretty_print }
    }

    fn event_type(event: &RenderEvent) -> &'static str {
        match event {
            RenderEvent::RunStart { .. } => "run.start",
            RenderEvent::RoundStart { .. } => "round.start",
            RenderEvent::TrackStart { .. } => "track.start",
            RenderEvent::TaskAccepted { .. } => "task.accepted",
            RenderEvent::TaskRejected { .. } => "task.rejected",
            RenderEvent::TrackComplete { .. } => "track.complete",
            RenderEvent::TrackSkipped { .. } => "track.skipped",
            RenderEvent::TrackFailed { .. } => "track.failed",
            RenderEvent::RoundEnd { .. } => "round.end",
            RenderEvent::Integrated { .. } => "merge.integrated",
            RenderEvent::GateResult { .. } => "merge.gate",
            RenderEvent::Suspended { .. } => "suspended",
            RenderEvent::RunEnd { .. } => "run.end",
        }
    }

    fn event_to_json(&self, event: &RenderEvent) -> Value {
        let mut value = serde_json::to_value(event).unwrap_or_else(|_| json!({}));
        if let Value::Object(map) = &mut value {
            map.remove("type");
            map.insert("v".into(), json!(1));
            map.insert("event_type".into(), json!(Self::event_type(event)));
            map.insert("ts".into(), json!(Local::now().to_rfc3339()));
        }
        value
    }
}

impl OutputRendererPlugin for JsonlRendererPlugin {
    fn name(&self) -> &str {
        "jsonl-renderer"
    }

    fn format(&self) -> &str {
        "jsonl"
    }

    fn render(&self, event: &RenderEvent) {
        let value = self.event_to_json(event);
        let line = if self.pretty_print {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        println!("{}", line.unwrap_or_else(|_| "{}".into()));
    }
}
