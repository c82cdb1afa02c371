#![cfg(feature = "serde")]

use goap_tools::{TraceEvent, VecTraceSink};

#[test]
fn trace_sink_json_roundtrip() {
    let sink = VecTraceSink {
        events: vec![
            TraceEvent::new(1, "agent.plan.adopt")
                .with_agent("guard")
                .with_detail("Patrol"),
            TraceEvent::new(2, "agent.action.begin")
                .with_agent("guard")
                .with_detail("Patrol"),
            TraceEvent::new(3, "agent.interrupt").with_agent("thief"),
        ],
    };

    let json = serde_json::to_string(&sink).expect("serialize");
    let roundtrip: VecTraceSink = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, sink);
}
