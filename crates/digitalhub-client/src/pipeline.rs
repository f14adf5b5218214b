// crates/digitalhub-client/src/pipeline.rs
// ============================================================================
// Module: Pipeline DSL
// Description: Declarative workflow steps with validated ordering.
// Purpose: Build the `spec.pipeline` definition interpreted by the backend.
// Dependencies: serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A [`Pipeline`] collects steps, each running one function action. Steps
//! exchange data by name: a step declares `outputs`, and another step's input
//! may reference one of them through [`StepRef::parameter`]. Ordering comes from
//! explicit [`Pipeline::then`] edges plus the implicit edges of such references.
//!
//! [`Pipeline::build`] validates the graph and emits a [`PipelineDefinition`]
//! whose `order` is a topological order that breaks ties by declaration order,
//! so equal inputs always yield equal definitions.
//!
//! Security posture: step templates are passed to the backend verbatim.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pipeline validation errors.
///
/// # Invariants
/// - Variants name the offending step so definitions can be fixed by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The pipeline has no steps.
    #[error("pipeline {0} has no steps")]
    Empty(String),
    /// Two steps share a name.
    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
    /// A step template lacks its `action`.
    #[error("step {0} has no action")]
    MissingAction(String),
    /// A reference names a step that is not part of the pipeline.
    #[error("step {step} references unknown step {reference}")]
    UnknownStep {
        /// Referencing step.
        step: String,
        /// Missing step name.
        reference: String,
    },
    /// An input references an output its source step does not declare.
    #[error("step {step} reads undeclared output {parameter} of step {source_step}")]
    UndeclaredOutput {
        /// Consuming step.
        step: String,
        /// Producing step.
        source_step: String,
        /// Missing output name.
        parameter: String,
    },
    /// The dependency graph contains a cycle through these steps.
    #[error("dependency cycle between steps: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

// ============================================================================
// SECTION: Builder Types
// ============================================================================

/// Step container flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Steps ordered only by their dependencies.
    Dag,
    /// Steps executed one after another.
    Steps,
}

/// Where a step input comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "from")]
pub enum ParamSource {
    /// Output `parameter` of step `step`.
    Output {
        /// Producing step.
        step: String,
        /// Output name.
        parameter: String,
    },
    /// Workflow-level run parameter.
    Workflow {
        /// Parameter name.
        name: String,
    },
    /// Literal value.
    Value {
        /// The value.
        value: Value,
    },
}

impl ParamSource {
    /// References a workflow run parameter.
    #[must_use]
    pub fn workflow(name: impl Into<String>) -> Self {
        Self::Workflow {
            name: name.into(),
        }
    }

    /// Passes a literal value.
    #[must_use]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value {
            value: value.into(),
        }
    }
}

/// Step under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Step name, unique within the pipeline.
    name: String,
    /// Function name executed by the step.
    function: String,
    /// Task template: `action` plus extra task fields.
    template: Map<String, Value>,
    /// Named inputs.
    inputs: BTreeMap<String, ParamSource>,
    /// Declared output names.
    outputs: Vec<String>,
}

impl Step {
    /// Starts a step running `function`; the step is named after the function.
    #[must_use]
    pub fn new(function: impl Into<String>) -> Self {
        let function = function.into();
        Self {
            name: function.clone(),
            function,
            template: Map::new(),
            inputs: BTreeMap::new(),
            outputs: Vec::new(),
        }
    }

    /// Renames the step.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the task action (`job`, `serve`, `build`, ...).
    #[must_use]
    pub fn action(self, action: &str) -> Self {
        self.template_field("action", action)
    }

    /// Sets an extra template field.
    #[must_use]
    pub fn template_field(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.template.insert(field.to_string(), value.into());
        self
    }

    /// Declares an input.
    #[must_use]
    pub fn input(mut self, name: &str, source: ParamSource) -> Self {
        self.inputs.insert(name.to_string(), source);
        self
    }

    /// Declares outputs.
    #[must_use]
    pub fn outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs.extend(outputs.into_iter().map(Into::into));
        self
    }
}

/// Handle to a step added to a pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRef {
    /// Step name.
    name: String,
}

impl StepRef {
    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// References output `parameter` of this step.
    #[must_use]
    pub fn parameter(&self, parameter: &str) -> ParamSource {
        ParamSource::Output {
            step: self.name.clone(),
            parameter: parameter.to_string(),
        }
    }
}

/// Pipeline under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    /// Entrypoint container name.
    entrypoint: String,
    /// Container flavor.
    container: ContainerKind,
    /// Steps in declaration order.
    steps: Vec<Step>,
    /// Explicit `(before, after)` edges by step name.
    edges: Vec<(String, String)>,
}

impl Pipeline {
    /// Starts a DAG pipeline.
    #[must_use]
    pub fn dag(entrypoint: impl Into<String>) -> Self {
        Self::new(entrypoint, ContainerKind::Dag)
    }

    /// Starts a sequential steps pipeline.
    #[must_use]
    pub fn steps(entrypoint: impl Into<String>) -> Self {
        Self::new(entrypoint, ContainerKind::Steps)
    }

    /// Starts a pipeline of the given flavor.
    #[must_use]
    pub fn new(entrypoint: impl Into<String>, container: ContainerKind) -> Self {
        Self {
            entrypoint: entrypoint.into(),
            container,
            steps: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Adds a step and returns its handle.
    pub fn step(&mut self, step: Step) -> StepRef {
        let handle = StepRef {
            name: step.name.clone(),
        };
        self.steps.push(step);
        handle
    }

    /// Declares that `before` runs before `after`.
    pub fn then(&mut self, before: &StepRef, after: &StepRef) -> &mut Self {
        self.edges.push((before.name.clone(), after.name.clone()));
        self
    }

    /// Declares a linear chain `a -> b -> c ...`.
    pub fn chain(&mut self, steps: &[&StepRef]) -> &mut Self {
        for pair in steps.windows(2) {
            if let [before, after] = pair {
                self.then(before, after);
            }
        }
        self
    }

    /// Validates the pipeline and returns its definition.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] for empty pipelines, duplicate names, steps
    /// without action, dangling references, or dependency cycles.
    pub fn build(&self) -> Result<PipelineDefinition, PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::Empty(self.entrypoint.clone()));
        }
        let mut index: BTreeMap<&str, usize> = BTreeMap::new();
        for (position, step) in self.steps.iter().enumerate() {
            if index.insert(step.name.as_str(), position).is_some() {
                return Err(PipelineError::DuplicateStep(step.name.clone()));
            }
            if !step.template.get("action").is_some_and(Value::is_string) {
                return Err(PipelineError::MissingAction(step.name.clone()));
            }
        }

        let mut depends: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); self.steps.len()];
        let mut parameters = BTreeSet::new();
        for (position, step) in self.steps.iter().enumerate() {
            for source in step.inputs.values() {
                match source {
                    ParamSource::Output {
                        step: source_step,
                        parameter,
                    } => {
                        let source_position = lookup(&index, &step.name, source_step)?;
                        if !self.steps[source_position].outputs.contains(parameter) {
                            return Err(PipelineError::UndeclaredOutput {
                                step: step.name.clone(),
                                source_step: source_step.clone(),
                                parameter: parameter.clone(),
                            });
                        }
                        depends[position].insert(source_position);
                    }
                    ParamSource::Workflow {
                        name,
                    } => {
                        parameters.insert(name.clone());
                    }
                    ParamSource::Value {
                        ..
                    } => {}
                }
            }
        }
        for (before, after) in &self.edges {
            let after_position = lookup(&index, before, after)?;
            let before_position = lookup(&index, after, before)?;
            depends[after_position].insert(before_position);
        }

        let order = topological_order(&depends).map_err(|remaining| {
            PipelineError::Cycle(remaining.into_iter().map(|i| self.steps[i].name.clone()).collect())
        })?;

        let steps = self
            .steps
            .iter()
            .zip(&depends)
            .map(|(step, deps)| StepDefinition {
                name: step.name.clone(),
                function: step.function.clone(),
                template: step.template.clone(),
                inputs: step.inputs.clone(),
                outputs: step.outputs.clone(),
                depends: deps.iter().map(|i| self.steps[*i].name.clone()).collect(),
            })
            .collect();
        Ok(PipelineDefinition {
            entrypoint: self.entrypoint.clone(),
            kind: self.container,
            parameters: parameters.into_iter().collect(),
            steps,
            order: order.into_iter().map(|i| self.steps[i].name.clone()).collect(),
        })
    }
}

/// Resolves a referenced step name.
fn lookup(index: &BTreeMap<&str, usize>, step: &str, reference: &str) -> Result<usize, PipelineError> {
    index.get(reference).copied().ok_or_else(|| PipelineError::UnknownStep {
        step: step.to_string(),
        reference: reference.to_string(),
    })
}

/// Kahn's algorithm; ready steps are released lowest index first.
///
/// Returns the unresolved steps when a cycle remains.
fn topological_order(depends: &[BTreeSet<usize>]) -> Result<Vec<usize>, Vec<usize>> {
    let mut pending: Vec<usize> = depends.iter().map(BTreeSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); depends.len()];
    for (step, deps) in depends.iter().enumerate() {
        for dep in deps {
            dependents[*dep].push(step);
        }
    }
    let mut ready: BTreeSet<usize> =
        pending.iter().enumerate().filter(|(_, count)| **count == 0).map(|(i, _)| i).collect();
    let mut order = Vec::with_capacity(depends.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for dependent in &dependents[next] {
            pending[*dependent] = pending[*dependent].saturating_sub(1);
            if pending[*dependent] == 0 {
                ready.insert(*dependent);
            }
        }
    }
    if order.len() == depends.len() {
        Ok(order)
    } else {
        Err((0..depends.len()).filter(|i| !order.contains(i)).collect())
    }
}

// ============================================================================
// SECTION: Definition
// ============================================================================

/// Validated step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Step name.
    pub name: String,
    /// Function name.
    pub function: String,
    /// Task template (`action` plus extra fields).
    pub template: Map<String, Value>,
    /// Named inputs.
    #[serde(default)]
    pub inputs: BTreeMap<String, ParamSource>,
    /// Declared outputs.
    #[serde(default)]
    pub outputs: Vec<String>,
    /// Names of steps that must finish first.
    #[serde(default)]
    pub depends: Vec<String>,
}

impl StepDefinition {
    /// Returns the task action.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.template.get("action").and_then(Value::as_str)
    }
}

/// Validated pipeline stored in a workflow's `spec.pipeline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Entrypoint container name.
    pub entrypoint: String,
    /// Container flavor.
    pub kind: ContainerKind,
    /// Workflow parameters read by steps.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Steps in declaration order.
    pub steps: Vec<StepDefinition>,
    /// Execution order.
    pub order: Vec<String>,
}

impl PipelineDefinition {
    /// Serializes the definition for `spec.pipeline`.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if serialization fails.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Returns steps in execution order.
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<&StepDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.steps.iter().find(|step| &step.name == name))
            .collect()
    }
}

#[cfg(test)]
mod tests;
