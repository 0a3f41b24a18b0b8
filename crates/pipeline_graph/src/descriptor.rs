//! Serialized pipeline descriptor, in the managed runner's IR layout.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{GraphError, topological_order};

/// IR schema version understood by the managed pipeline runner.
pub const SCHEMA_VERSION: &str = "2.1.0";

/// Key of the single output parameter a component may declare.
pub const OUTPUT_KEY: &str = "Output";

/// Parameter type of every input and output.
pub const STRING_TYPE: &str = "STRING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineDescriptor {
    pub pipeline_info: PipelineInfo,
    pub root: RootSpec,
    pub components: IndexMap<String, ComponentSpec>,
    pub deployment_spec: DeploymentSpec,
    pub schema_version: String,
    pub sdk_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInfo {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootSpec {
    pub input_definitions: InputDefinitions,
    pub dag: Dag,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputDefinitions {
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub parameter_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    #[serde(default, skip_serializing_if = "core::ops::Not::not")]
    pub is_optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDefinitions {
    #[serde(default)]
    pub parameters: IndexMap<String, OutputParameterSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputParameterSpec {
    pub parameter_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dag {
    /// Tasks in dependency order
    pub tasks: IndexMap<String, TaskSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSpec {
    pub task_info: TaskInfo,
    pub component_ref: ComponentRef,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_tasks: Vec<String>,

    #[serde(default)]
    pub inputs: TaskInputs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskInputs {
    #[serde(default)]
    pub parameters: IndexMap<String, ParameterBinding>,
}

/// Where a task input gets its value from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterBinding {
    ComponentInputParameter(String),
    TaskOutputParameter(TaskOutputParameter),
    RuntimeValue(RuntimeValue),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskOutputParameter {
    pub producer_task: String,
    pub output_parameter_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeValue {
    pub constant: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    pub executor_label: String,

    #[serde(default)]
    pub input_definitions: InputDefinitions,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_definitions: Option<OutputDefinitions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpec {
    pub executors: IndexMap<String, ExecutorSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSpec {
    pub container: ContainerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl PipelineDescriptor {
    /// Returns task names so that every task follows the tasks it depends on.
    pub fn task_order(&self) -> Result<Vec<String>, GraphError> {
        let edges: Vec<(String, Vec<String>)> = self
            .root
            .dag
            .tasks
            .iter()
            .map(|(name, task)| (name.clone(), task.dependent_tasks.clone()))
            .collect();

        topological_order(&edges)
    }

    /// Returns the upstream task feeding `input` of `task`, if any.
    #[must_use]
    pub fn producer_of(&self, task: &str, input: &str) -> Option<&TaskOutputParameter> {
        match self.root.dag.tasks.get(task)?.inputs.parameters.get(input)? {
            ParameterBinding::TaskOutputParameter(output) => Some(output),
            _ => None,
        }
    }
}
