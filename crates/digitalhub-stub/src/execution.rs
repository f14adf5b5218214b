// crates/digitalhub-stub/src/execution.rs
// ============================================================================
// Module: Run Emulation
// Description: Effects of job, build, serve, and pipeline runs.
// Purpose: Give tests observable run outcomes without real runtimes.
// Dependencies: serde, serde_json, uuid
// ============================================================================

//! ## Overview
//! Run effects are applied when the run is created:
//! - `build` stores an image reference on the function;
//! - `serve` exposes `/services/{run id}` and stays `RUNNING`;
//! - `pipeline` executes the workflow's `spec.pipeline` steps in order,
//!   creating one task and run per step;
//! - any other action completes and materializes declared `outputs`.
//!
//! Top-level non-serve runs report `RUNNING` until read
//! [`crate::StubOptions::run_polls`] times; runs created by a pipeline settle
//! at once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Map;
use serde_json::Value;
use serde_json::json;

use crate::store::Pending;
use crate::store::Platform;
use crate::store::object_mut;
use crate::store::set_state;
use crate::store::task_string;

// ============================================================================
// SECTION: Pipeline Mirror
// ============================================================================

/// Pipeline step as stored in `spec.pipeline`.
#[derive(Debug, Deserialize)]
struct PipelineStep {
    /// Step name.
    name: String,
    /// Function name.
    function: String,
    /// Task template.
    #[serde(default)]
    template: Map<String, Value>,
    /// Input sources.
    #[serde(default)]
    inputs: BTreeMap<String, Value>,
    /// Declared outputs.
    #[serde(default)]
    outputs: Vec<String>,
}

/// Pipeline definition as stored in `spec.pipeline`.
#[derive(Debug, Deserialize)]
struct PipelineSpec {
    /// Steps in declaration order.
    steps: Vec<PipelineStep>,
    /// Execution order.
    order: Vec<String>,
}

// ============================================================================
// SECTION: Run Start
// ============================================================================

impl Platform {
    /// Applies run effects to `run` and returns its deferred completion.
    ///
    /// With `immediate` the final state is written at once.
    pub(crate) fn start_run(&mut self, project: &str, run: &mut Value, immediate: bool) -> Option<Pending> {
        let kind = run.get("kind").and_then(Value::as_str).unwrap_or_default().to_string();
        let action = kind.split_once('+').map_or("", |(_, rest)| rest.strip_suffix(":run").unwrap_or(rest));
        let outcome = match action {
            "serve" => {
                self.expose_service(run);
                set_state(run, "RUNNING");
                return None;
            }
            "build" => self.build(project, run),
            "pipeline" => self.run_pipeline(project, run),
            _ => self.complete_job(project, run),
        };
        let final_state = match outcome {
            Ok(()) => "COMPLETED".to_string(),
            Err(message) => {
                if let Some(status) = object_mut(run, "status") {
                    status.insert("message".to_string(), Value::String(message));
                }
                "ERROR".to_string()
            }
        };
        if immediate || self.options.run_polls == 0 {
            set_state(run, &final_state);
            return None;
        }
        set_state(run, "RUNNING");
        Some(Pending {
            polls: self.options.run_polls,
            final_state,
        })
    }

    /// Adds `status.service` pointing at the stub service route.
    fn expose_service(&self, run: &mut Value) {
        let id = run.get("id").and_then(Value::as_str).unwrap_or_default().to_string();
        let url = format!("{}/services/{id}", self.host);
        if let Some(status) = object_mut(run, "status") {
            status.insert("service".to_string(), json!({ "url": url, "name": id }));
        }
    }

    /// Stores an image reference on the built function.
    fn build(&mut self, project: &str, run: &Value) -> Result<(), String> {
        let Some(executable) = run_executable(run) else {
            return Err("run names no executable".to_string());
        };
        let position = self.executable_position(project, &executable)?;
        let stored = &mut self.entities[position];
        if stored.collection == "functions" {
            let image = format!(
                "registry.local/{project}/{}:{}",
                stored.field("name").unwrap_or_default(),
                stored.field("id").unwrap_or_default()
            );
            if let Some(spec) = object_mut(&mut stored.doc, "spec") {
                spec.insert("image".to_string(), Value::String(image));
            }
        }
        Ok(())
    }

    /// Materializes declared outputs of a job run.
    fn complete_job(&mut self, project: &str, run: &mut Value) -> Result<(), String> {
        let outputs: Vec<String> = run
            .get("spec")
            .and_then(|spec| spec.get("outputs"))
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).map(str::to_string).collect())
            .unwrap_or_default();
        if outputs.is_empty() {
            return Ok(());
        }
        let function_name = run_executable(run)
            .and_then(|exec| parse_executable(&exec).map(|(_, name, _)| name))
            .unwrap_or_else(|| "run".to_string());
        let mut keys = Map::new();
        for output in outputs {
            let (collection, kind) = if output == "model" { ("models", "model") } else { ("dataitems", "table") };
            let id = uuid::Uuid::new_v4().to_string();
            let name = format!("{function_name}-{output}");
            let doc = json!({
                "id": id,
                "name": name,
                "kind": kind,
                "project": project,
                "metadata": { "project": project, "name": name },
                "spec": { "path": format!("s3://stub/{project}/{collection}/{id}") },
                "status": { "state": "READY" },
            });
            self.insert(project, collection, doc, None);
            let key = format!("store://{project}/{}/{kind}/{name}:{id}", crate::store::singular(collection));
            keys.insert(output, Value::String(key));
        }
        if let Some(status) = object_mut(run, "status") {
            status.insert("outputs".to_string(), Value::Object(keys));
        }
        Ok(())
    }

    /// Executes the steps of a workflow pipeline.
    fn run_pipeline(&mut self, project: &str, run: &Value) -> Result<(), String> {
        let Some(executable) = run_executable(run) else {
            return Err("run names no workflow".to_string());
        };
        let position = self.executable_position(project, &executable)?;
        let pipeline_value = self.entities[position]
            .doc
            .get("spec")
            .and_then(|spec| spec.get("pipeline"))
            .cloned()
            .ok_or_else(|| format!("workflow {executable} has no pipeline"))?;
        let pipeline: PipelineSpec =
            serde_json::from_value(pipeline_value).map_err(|err| format!("invalid pipeline: {err}"))?;
        let parameters = run
            .get("spec")
            .and_then(|spec| spec.get("parameters"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let mut produced: BTreeMap<(String, String), Value> = BTreeMap::new();
        for name in &pipeline.order {
            let step = pipeline
                .steps
                .iter()
                .find(|step| &step.name == name)
                .ok_or_else(|| format!("order names unknown step {name}"))?;
            let outputs = self.run_step(project, step, &parameters, &produced)?;
            for (output, key) in outputs {
                produced.insert((step.name.clone(), output), key);
            }
        }
        Ok(())
    }

    /// Runs one pipeline step and returns its outputs.
    fn run_step(
        &mut self,
        project: &str,
        step: &PipelineStep,
        parameters: &Map<String, Value>,
        produced: &BTreeMap<(String, String), Value>,
    ) -> Result<Map<String, Value>, String> {
        let function = self
            .latest(project, "functions", &step.function)
            .ok_or_else(|| format!("step {} names unknown function {}", step.name, step.function))?;
        let executable = function.executable_string();
        let function_kind = function.field("kind").unwrap_or_default().to_string();
        let action = step
            .template
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| format!("step {} has no action", step.name))?;
        let task_kind = format!("{function_kind}+{action}");
        let mut extra = step.template.clone();
        extra.remove("action");

        let existing = self.entities.iter().position(|stored| {
            stored.project == project
                && stored.collection == "tasks"
                && stored.field("kind") == Some(task_kind.as_str())
                && stored.executable() == Some(executable.as_str())
        });
        let task_position = match existing {
            Some(position) => position,
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                let mut spec = extra.clone();
                spec.insert("function".to_string(), Value::String(executable.clone()));
                let task = json!({
                    "id": id, "name": id, "kind": task_kind, "project": project,
                    "metadata": { "project": project, "name": id },
                    "spec": spec, "status": { "state": "READY" },
                });
                self.insert(project, "tasks", task, None);
                self.entities.len() - 1
            }
        };
        let task = task_string(&self.entities[task_position]);

        let mut inputs = Map::new();
        for (input, source) in &step.inputs {
            let value = match source.get("from").and_then(Value::as_str) {
                Some("output") => {
                    let source_step = source.get("step").and_then(Value::as_str).unwrap_or_default();
                    let parameter = source.get("parameter").and_then(Value::as_str).unwrap_or_default();
                    produced
                        .get(&(source_step.to_string(), parameter.to_string()))
                        .cloned()
                        .ok_or_else(|| format!("step {source_step} produced no {parameter}"))?
                }
                Some("workflow") => {
                    let name = source.get("name").and_then(Value::as_str).unwrap_or_default();
                    parameters.get(name).cloned().unwrap_or(Value::Null)
                }
                _ => source.get("value").cloned().unwrap_or(Value::Null),
            };
            inputs.insert(input.clone(), value);
        }

        let id = uuid::Uuid::new_v4().to_string();
        let mut spec = extra;
        spec.insert("task".to_string(), Value::String(task));
        spec.insert("function".to_string(), Value::String(executable));
        spec.insert("inputs".to_string(), Value::Object(inputs));
        spec.insert("parameters".to_string(), Value::Object(Map::new()));
        spec.insert("outputs".to_string(), json!(step.outputs));
        let mut child = json!({
            "id": id, "name": id, "kind": format!("{task_kind}:run"), "project": project,
            "metadata": { "project": project, "name": id },
            "spec": spec, "status": {},
        });
        self.start_run(project, &mut child, true);
        let failed = child.get("status").and_then(|status| status.get("state")).and_then(Value::as_str)
            == Some("ERROR");
        let outputs = child
            .get("status")
            .and_then(|status| status.get("outputs"))
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        self.insert(project, "runs", child, None);
        if failed {
            return Err(format!("step {} failed", step.name));
        }
        Ok(outputs)
    }

    /// Finds the function or workflow named by an executable string.
    fn executable_position(&self, project: &str, executable: &str) -> Result<usize, String> {
        let (_, name, id) =
            parse_executable(executable).ok_or_else(|| format!("invalid executable {executable}"))?;
        self.entities
            .iter()
            .position(|stored| {
                stored.project == project
                    && matches!(stored.collection.as_str(), "functions" | "workflows")
                    && stored.field("name") == Some(name.as_str())
                    && stored.field("id") == Some(id.as_str())
            })
            .ok_or_else(|| format!("unknown executable {executable}"))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the executable string named by a run spec.
fn run_executable(run: &Value) -> Option<String> {
    let spec = run.get("spec")?;
    spec.get("function").or_else(|| spec.get("workflow")).and_then(Value::as_str).map(str::to_string)
}

/// Splits `{kind}://{project}/{name}:{id}` into `(project, name, id)`.
fn parse_executable(executable: &str) -> Option<(String, String, String)> {
    let (_, rest) = executable.split_once("://")?;
    let (project, reference) = rest.split_once('/')?;
    let (name, id) = reference.rsplit_once(':')?;
    Some((project.to_string(), name.to_string(), id.to_string()))
}
