// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ready-made node models, composed from small capabilities rather than
//! inheritance: a fixed-port builder model and a dynamic-output variant
//! whose port count varies while the node is alive.

use crate::node::{NodeModel, ValidationState};
use crate::port::{ConnectionPolicy, DataType, PortKind};
use egui::Vec2;
use std::cell::Cell;
use std::rc::Rc;

/// Declaration of a single port on a model
#[derive(Debug, Clone)]
pub struct PortSpec {
    /// Data type of the port
    pub data_type: DataType,
    /// Display text; defaults to the data type name
    pub caption: Option<String>,
    /// Capacity override; defaults to one-per-input / many-per-output
    pub policy: Option<ConnectionPolicy>,
}

impl PortSpec {
    /// Declare a port carrying `data_type`
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            caption: None,
            policy: None,
        }
    }

    /// Set the display text
    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Override the capacity policy
    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// A node model with a fixed set of declared ports
#[derive(Debug, Clone)]
pub struct StaticModel {
    caption: String,
    caption_visible: bool,
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
    validation_state: ValidationState,
    validation_message: String,
    content_size: Option<Vec2>,
}

impl StaticModel {
    /// Create a model with the given caption and no ports
    pub fn new(caption: impl Into<String>) -> Self {
        Self {
            caption: caption.into(),
            caption_visible: true,
            inputs: Vec::new(),
            outputs: Vec::new(),
            validation_state: ValidationState::Valid,
            validation_message: String::new(),
            content_size: None,
        }
    }

    /// Append an input port
    pub fn with_input(mut self, spec: PortSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    /// Append an output port
    pub fn with_output(mut self, spec: PortSpec) -> Self {
        self.outputs.push(spec);
        self
    }

    /// Report a validation state and message
    pub fn with_validation(
        mut self,
        state: ValidationState,
        message: impl Into<String>,
    ) -> Self {
        self.validation_state = state;
        self.validation_message = message.into();
        self
    }

    /// Hide the caption
    pub fn with_caption_hidden(mut self) -> Self {
        self.caption_visible = false;
        self
    }

    /// Declare embedded content of the given size
    pub fn with_content_size(mut self, size: Vec2) -> Self {
        self.content_size = Some(size);
        self
    }

    fn specs(&self, kind: PortKind) -> &[PortSpec] {
        match kind {
            PortKind::Input => &self.inputs,
            PortKind::Output => &self.outputs,
        }
    }
}

impl NodeModel for StaticModel {
    fn num_ports(&self, kind: PortKind) -> usize {
        self.specs(kind).len()
    }

    fn data_type(&self, kind: PortKind, index: usize) -> DataType {
        self.specs(kind)[index].data_type.clone()
    }

    fn port_caption(&self, kind: PortKind, index: usize) -> String {
        let spec = &self.specs(kind)[index];
        spec.caption
            .clone()
            .unwrap_or_else(|| spec.data_type.name.clone())
    }

    fn connection_policy(&self, kind: PortKind, index: usize) -> ConnectionPolicy {
        self.specs(kind)[index].policy.unwrap_or(match kind {
            PortKind::Input => ConnectionPolicy::One,
            PortKind::Output => ConnectionPolicy::Many,
        })
    }

    fn caption(&self) -> String {
        self.caption.clone()
    }

    fn caption_visible(&self) -> bool {
        self.caption_visible
    }

    fn validation_state(&self) -> ValidationState {
        self.validation_state
    }

    fn validation_message(&self) -> String {
        self.validation_message.clone()
    }

    fn embedded_content_size(&self) -> Option<Vec2> {
        self.content_size
    }
}

/// A model whose output-port count varies while the node is alive.
///
/// All outputs share one [`PortSpec`]; inputs and everything else delegate
/// to the wrapped [`StaticModel`]. The count lives behind a shared handle
/// so the owner can change it after the model is boxed into a node — the
/// next state access reconciles (single editing thread, no locking).
#[derive(Debug, Clone)]
pub struct DynamicOutputModel {
    base: StaticModel,
    output_spec: PortSpec,
    count: Rc<Cell<usize>>,
}

impl DynamicOutputModel {
    /// Wrap `base`, replacing its outputs with `initial` copies of
    /// `output_spec`. Returns the model and the count handle.
    pub fn new(
        base: StaticModel,
        output_spec: PortSpec,
        initial: usize,
    ) -> (Self, Rc<Cell<usize>>) {
        let count = Rc::new(Cell::new(initial));
        (
            Self {
                base,
                output_spec,
                count: Rc::clone(&count),
            },
            count,
        )
    }
}

impl NodeModel for DynamicOutputModel {
    fn num_ports(&self, kind: PortKind) -> usize {
        match kind {
            PortKind::Input => self.base.num_ports(kind),
            PortKind::Output => self.count.get(),
        }
    }

    fn data_type(&self, kind: PortKind, index: usize) -> DataType {
        match kind {
            PortKind::Input => self.base.data_type(kind, index),
            PortKind::Output => self.output_spec.data_type.clone(),
        }
    }

    fn port_caption(&self, kind: PortKind, index: usize) -> String {
        match kind {
            PortKind::Input => self.base.port_caption(kind, index),
            PortKind::Output => self
                .output_spec
                .caption
                .clone()
                .unwrap_or_else(|| format!("{} {index}", self.output_spec.data_type.name)),
        }
    }

    fn connection_policy(&self, kind: PortKind, index: usize) -> ConnectionPolicy {
        match kind {
            PortKind::Input => self.base.connection_policy(kind, index),
            PortKind::Output => self.output_spec.policy.unwrap_or(ConnectionPolicy::Many),
        }
    }

    fn caption(&self) -> String {
        self.base.caption()
    }

    fn caption_visible(&self) -> bool {
        self.base.caption_visible()
    }

    fn validation_state(&self) -> ValidationState {
        self.base.validation_state()
    }

    fn validation_message(&self) -> String {
        self.base.validation_message()
    }

    fn embedded_content_size(&self) -> Option<Vec2> {
        self.base.embedded_content_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_model_port_captions() {
        let model = StaticModel::new("Mix")
            .with_input(PortSpec::new(DataType::new("float", "Float")).with_caption("a"))
            .with_input(PortSpec::new(DataType::new("float", "Float")));

        assert_eq!(model.port_caption(PortKind::Input, 0), "a");
        assert_eq!(model.port_caption(PortKind::Input, 1), "Float");
    }

    #[test]
    fn test_dynamic_output_count_is_live() {
        let (model, count) = DynamicOutputModel::new(
            StaticModel::new("Fan"),
            PortSpec::new(DataType::new("exec", "Exec")),
            1,
        );
        assert_eq!(model.num_ports(PortKind::Output), 1);
        count.set(4);
        assert_eq!(model.num_ports(PortKind::Output), 4);
        assert_eq!(model.port_caption(PortKind::Output, 2), "Exec 2");
    }
}
