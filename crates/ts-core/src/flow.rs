//! Flow runner for the terminal.
//!
//! Page automation has no meaning here, so each step is described on the
//! renderer's status stream and `message` steps become answer lines.

use std::io::Write;

use serde_json::Value;
use ts_backend::FlowRunner;
use ts_protocol::{AgentFlow, FlowAction, FlowStep};

use crate::render::SharedRenderer;

pub struct PrintFlows<W: Write, E: Write> {
    renderer: SharedRenderer<W, E>,
}

impl<W: Write + Send, E: Write + Send> PrintFlows<W, E> {
    pub fn new(renderer: SharedRenderer<W, E>) -> Self {
        Self { renderer }
    }

    fn run(&self, flow: &AgentFlow) {
        let mut renderer = self.renderer.lock();
        for step in &flow.steps {
            match (step.action, step.value.as_deref()) {
                (FlowAction::Message, Some(text)) => renderer.write_message(text),
                (FlowAction::Message, None) => {}
                _ => renderer.flow_step(&describe(step)),
            }
        }
    }
}

fn describe(step: &FlowStep) -> String {
    let action = match step.action {
        FlowAction::Message => "message",
        FlowAction::Click => "click",
        FlowAction::Fill => "fill",
        FlowAction::Goto => "goto",
    };
    let mut line = action.to_string();
    if let Some(selector) = &step.selector {
        line.push(' ');
        line.push_str(selector);
    }
    if let Some(value) = &step.value {
        line.push_str(&format!(" {value:?}"));
    }
    line
}

impl<W: Write + Send, E: Write + Send> FlowRunner for PrintFlows<W, E> {
    fn try_run(&self, payload: &Value) -> bool {
        match serde_json::from_value::<AgentFlow>(payload.clone()) {
            Ok(flow) => {
                tracing::debug!(steps = flow.steps.len(), "running flow");
                self.run(&flow);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "payload is not a flow");
                false
            }
        }
    }
}
