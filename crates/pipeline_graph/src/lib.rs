//! Declarative pipeline graphs.
//!
//! A [`PipelineDefinition`] names container components and the tasks that
//! run them. Task inputs are bound to constants, to pipeline parameters or to
//! the output of an upstream task; the last kind is what orders the graph.
//! [`PipelineDefinition::compile`] validates the graph and produces a
//! [`PipelineDescriptor`] for the managed pipeline runner. Nothing is executed
//! locally.

mod descriptor;
mod error;

use std::collections::{HashMap, HashSet, VecDeque};

use indexmap::IndexMap;
use serde_json::Value;

pub use descriptor::*;
pub use error::GraphError;

/// A pipeline-level or component-level input parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub default: Option<Value>,
}

impl Parameter {
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    #[must_use]
    pub fn with_default(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }
}

/// One element of a component's container arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Literal(String),

    /// Replaced by the value of the named input at run time
    Input(String),

    /// Replaced by the path the component must write its output to
    OutputFile,
}

impl Arg {
    fn render(&self) -> String {
        match self {
            Self::Literal(text) => text.clone(),
            Self::Input(name) => format!("{{{{$.inputs.parameters['{name}']}}}}"),
            Self::OutputFile => format!("{{{{$.outputs.parameters['{OUTPUT_KEY}'].output_file}}}}"),
        }
    }
}

/// A containerized step with typed inputs and at most one output.
#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    pub args: Vec<Arg>,
    pub inputs: Vec<Parameter>,
    pub has_output: bool,
}

impl Component {
    #[must_use]
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            command: Vec::new(),
            args: Vec::new(),
            inputs: Vec::new(),
            has_output: false,
        }
    }

    #[must_use]
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a literal argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(Arg::Literal(arg.into()));
        self
    }

    /// Declares an input and passes it as `flag <value>`.
    #[must_use]
    pub fn with_input_flag(mut self, flag: &str, input: Parameter) -> Self {
        self.args.push(Arg::Literal(flag.to_string()));
        self.args.push(Arg::Input(input.name.clone()));
        self.inputs.push(input);
        self
    }

    /// Declares an input and passes its value as a bare argument.
    #[must_use]
    pub fn with_input_arg(mut self, input: Parameter) -> Self {
        self.args.push(Arg::Input(input.name.clone()));
        self.inputs.push(input);
        self
    }

    /// Declares the output and passes its file path as `flag <path>`.
    #[must_use]
    pub fn with_output_flag(mut self, flag: &str) -> Self {
        self.args.push(Arg::Literal(flag.to_string()));
        self.args.push(Arg::OutputFile);
        self.has_output = true;
        self
    }

    fn executor_label(&self) -> String {
        format!("exec-{}", self.name)
    }

    fn component_key(&self) -> String {
        format!("comp-{}", self.name)
    }
}

/// Source of a task input.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Constant(Value),
    Parameter(String),
    TaskOutput(String),
}

/// A node of the graph: one run of a component.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub component: String,
    pub inputs: IndexMap<String, Binding>,
}

impl Task {
    #[must_use]
    pub fn new(name: impl Into<String>, component: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component: component.into(),
            inputs: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn bind(mut self, input: impl Into<String>, binding: Binding) -> Self {
        self.inputs.insert(input.into(), binding);
        self
    }

    /// Binds each named input to the pipeline parameter of the same name.
    #[must_use]
    pub fn bind_parameters(mut self, names: &[&str]) -> Self {
        for name in names {
            self.inputs
                .insert((*name).to_string(), Binding::Parameter((*name).to_string()));
        }
        self
    }

    fn upstream(&self) -> Vec<String> {
        let mut producers: Vec<String> = Vec::new();
        for binding in self.inputs.values() {
            if let Binding::TaskOutput(producer) = binding
                && !producers.contains(producer)
            {
                producers.push(producer.clone());
            }
        }
        producers
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub name: String,
    pub description: Option<String>,
    pub parameters: Vec<Parameter>,
    pub components: Vec<Component>,
    pub tasks: Vec<Task>,
}

impl PipelineDefinition {
    /// Validates the graph and returns tasks in dependency order.
    pub fn execution_order(&self) -> Result<Vec<&Task>, GraphError> {
        let components = self.component_index()?;
        let mut tasks: HashMap<&str, &Task> = HashMap::new();
        for task in &self.tasks {
            if tasks.insert(task.name.as_str(), task).is_some() {
                return Err(GraphError::DuplicateTask(task.name.clone()));
            }
        }

        let parameters: HashSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();

        for task in &self.tasks {
            let component = components.get(task.component.as_str()).ok_or_else(|| {
                GraphError::UnknownComponent {
                    task: task.name.clone(),
                    component: task.component.clone(),
                }
            })?;

            for (input, binding) in &task.inputs {
                if !component.inputs.iter().any(|p| &p.name == input) {
                    return Err(GraphError::UnknownInput {
                        task: task.name.clone(),
                        input: input.clone(),
                    });
                }

                match binding {
                    Binding::Constant(_) => {}
                    Binding::Parameter(parameter) => {
                        if !parameters.contains(parameter.as_str()) {
                            return Err(GraphError::UnknownParameter {
                                task: task.name.clone(),
                                parameter: parameter.clone(),
                            });
                        }
                    }
                    Binding::TaskOutput(producer) => {
                        let upstream = tasks.get(producer.as_str()).ok_or_else(|| {
                            GraphError::UnknownTask {
                                task: task.name.clone(),
                                producer: producer.clone(),
                            }
                        })?;
                        let produces = components
                            .get(upstream.component.as_str())
                            .is_some_and(|c| c.has_output);
                        if !produces {
                            return Err(GraphError::MissingOutput {
                                task: task.name.clone(),
                                producer: producer.clone(),
                            });
                        }
                    }
                }
            }

            if let Some(unbound) = component
                .inputs
                .iter()
                .find(|p| p.default.is_none() && !task.inputs.contains_key(&p.name))
            {
                return Err(GraphError::UnboundInput {
                    task: task.name.clone(),
                    input: unbound.name.clone(),
                });
            }
        }

        let edges: Vec<(String, Vec<String>)> = self
            .tasks
            .iter()
            .map(|task| (task.name.clone(), task.upstream()))
            .collect();

        topological_order(&edges)?
            .iter()
            .map(|name| {
                tasks
                    .get(name.as_str())
                    .copied()
                    .ok_or_else(|| GraphError::UnknownTask {
                        task: name.clone(),
                        producer: name.clone(),
                    })
            })
            .collect()
    }

    /// Validates the graph and serializes it to a descriptor.
    pub fn compile(&self, sdk_version: &str) -> Result<PipelineDescriptor, GraphError> {
        let order = self.execution_order()?;
        let components = self.component_index()?;

        let mut dag_tasks = IndexMap::new();
        let mut component_specs = IndexMap::new();
        let mut executors = IndexMap::new();

        for task in order {
            let Some(component) = components.get(task.component.as_str()) else {
                continue;
            };

            let parameters = task
                .inputs
                .iter()
                .map(|(input, binding)| (input.clone(), compile_binding(binding)))
                .collect();

            dag_tasks.insert(
                task.name.clone(),
                TaskSpec {
                    task_info: TaskInfo {
                        name: task.name.clone(),
                    },
                    component_ref: ComponentRef {
                        name: component.component_key(),
                    },
                    dependent_tasks: task.upstream(),
                    inputs: TaskInputs { parameters },
                },
            );

            if component_specs.contains_key(&component.component_key()) {
                continue;
            }

            component_specs.insert(
                component.component_key(),
                ComponentSpec {
                    executor_label: component.executor_label(),
                    input_definitions: input_definitions(&component.inputs),
                    output_definitions: component.has_output.then(|| OutputDefinitions {
                        parameters: IndexMap::from([(
                            OUTPUT_KEY.to_string(),
                            OutputParameterSpec {
                                parameter_type: STRING_TYPE.to_string(),
                            },
                        )]),
                    }),
                },
            );

            executors.insert(
                component.executor_label(),
                ExecutorSpec {
                    container: ContainerSpec {
                        image: component.image.clone(),
                        command: component.command.clone(),
                        args: component.args.iter().map(Arg::render).collect(),
                    },
                },
            );
        }

        Ok(PipelineDescriptor {
            pipeline_info: PipelineInfo {
                name: self.name.clone(),
                description: self.description.clone(),
            },
            root: RootSpec {
                input_definitions: input_definitions(&self.parameters),
                dag: Dag { tasks: dag_tasks },
            },
            components: component_specs,
            deployment_spec: DeploymentSpec { executors },
            schema_version: SCHEMA_VERSION.to_string(),
            sdk_version: sdk_version.to_string(),
        })
    }

    fn component_index(&self) -> Result<HashMap<&str, &Component>, GraphError> {
        let mut index = HashMap::new();
        for component in &self.components {
            if index.insert(component.name.as_str(), component).is_some() {
                return Err(GraphError::DuplicateComponent(component.name.clone()));
            }
        }
        Ok(index)
    }
}

fn compile_binding(binding: &Binding) -> ParameterBinding {
    match binding {
        Binding::Constant(value) => ParameterBinding::RuntimeValue(RuntimeValue {
            constant: value.clone(),
        }),
        Binding::Parameter(name) => ParameterBinding::ComponentInputParameter(name.clone()),
        Binding::TaskOutput(producer) => ParameterBinding::TaskOutputParameter(TaskOutputParameter {
            producer_task: producer.clone(),
            output_parameter_key: OUTPUT_KEY.to_string(),
        }),
    }
}

fn input_definitions(parameters: &[Parameter]) -> InputDefinitions {
    InputDefinitions {
        parameters: parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    ParameterSpec {
                        parameter_type: STRING_TYPE.to_string(),
                        default_value: p.default.clone(),
                        is_optional: p.default.is_some(),
                    },
                )
            })
            .collect(),
    }
}

/// Kahn's algorithm over `(node, upstream nodes)` pairs.
///
/// Ties keep declaration order. Unknown upstream names are an error.
pub(crate) fn topological_order(edges: &[(String, Vec<String>)]) -> Result<Vec<String>, GraphError> {
    let position: HashMap<&str, usize> = edges
        .iter()
        .enumerate()
        .map(|(i, (name, _))| (name.as_str(), i))
        .collect();

    let mut in_degree = vec![0_usize; edges.len()];
    let mut downstream: Vec<Vec<usize>> = vec![Vec::new(); edges.len()];

    for (node, (name, upstream)) in edges.iter().enumerate() {
        for producer in upstream {
            let &from = position
                .get(producer.as_str())
                .ok_or_else(|| GraphError::UnknownTask {
                    task: name.clone(),
                    producer: producer.clone(),
                })?;
            if let Some(slot) = downstream.get_mut(from) {
                slot.push(node);
            }
            if let Some(degree) = in_degree.get_mut(node) {
                *degree += 1;
            }
        }
    }

    let mut ready: VecDeque<usize> = (0..edges.len())
        .filter(|&i| in_degree.get(i) == Some(&0))
        .collect();
    let mut order = Vec::with_capacity(edges.len());

    while let Some(node) = ready.pop_front() {
        if let Some((name, _)) = edges.get(node) {
            order.push(name.clone());
        }
        for &next in downstream.get(node).map(Vec::as_slice).unwrap_or_default() {
            if let Some(degree) = in_degree.get_mut(next) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(next);
                }
            }
        }
    }

    if order.len() < edges.len() {
        let stuck = edges
            .iter()
            .enumerate()
            .filter(|(i, _)| in_degree.get(*i).is_some_and(|d| *d > 0))
            .map(|(_, (name, _))| name.clone())
            .collect();
        return Err(GraphError::Cycle(stuck));
    }

    Ok(order)
}
