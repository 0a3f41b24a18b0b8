use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("task {0} is declared twice")]
    DuplicateTask(String),

    #[error("component {0} is declared twice")]
    DuplicateComponent(String),

    #[error("task {task} uses unknown component {component}")]
    UnknownComponent { task: String, component: String },

    #[error("task {task} binds unknown input {input}")]
    UnknownInput { task: String, input: String },

    #[error("task {task} reads pipeline parameter {parameter}, which is not declared")]
    UnknownParameter { task: String, parameter: String },

    #[error("task {task} depends on unknown task {producer}")]
    UnknownTask { task: String, producer: String },

    #[error("task {task} reads the output of {producer}, which declares none")]
    MissingOutput { task: String, producer: String },

    #[error("task {task} leaves required input {input} unbound")]
    UnboundInput { task: String, input: String },

    #[error("pipeline graph has a cycle through: {}", .0.join(", "))]
    Cycle(Vec<String>),
}
