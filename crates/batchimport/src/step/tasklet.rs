use tracing::info;

use super::{Step, StepContext, StepExecution, StepStatus};
use crate::error::{StepFailure, TaskletError};

/// A single unit of work run once per step execution.
pub trait Tasklet: Send {
    fn execute(&mut self, ctx: &StepContext<'_>) -> Result<(), TaskletError>;
}

impl<F> Tasklet for F
where
    F: FnMut(&StepContext<'_>) -> Result<(), TaskletError> + Send,
{
    fn execute(&mut self, ctx: &StepContext<'_>) -> Result<(), TaskletError> {
        self(ctx)
    }
}

pub struct TaskletStep {
    name: String,
    tasklet: Box<dyn Tasklet>,
}

impl TaskletStep {
    pub fn new(name: impl Into<String>, tasklet: impl Tasklet + 'static) -> Self {
        Self {
            name: name.into(),
            tasklet: Box::new(tasklet),
        }
    }
}

impl Step for TaskletStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(
        &mut self,
        ctx: &StepContext<'_>,
        _execution: &mut StepExecution,
    ) -> Result<StepStatus, StepFailure> {
        self.tasklet.execute(ctx)?;
        Ok(StepStatus::Completed)
    }
}

/// Greets and logs selected job parameters.
pub struct ParameterEchoTasklet {
    keys: Vec<String>,
    require_all: bool,
}

impl Default for ParameterEchoTasklet {
    fn default() -> Self {
        Self::new(["uuid", "date", "hour"])
    }
}

impl ParameterEchoTasklet {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            require_all: false,
        }
    }

    /// Fail instead of skipping keys that are absent.
    pub fn require_all(mut self) -> Self {
        self.require_all = true;
        self
    }

    /// The `KEY ---> value` lines for the parameters present.
    pub fn lines(&self, ctx: &StepContext<'_>) -> Result<Vec<String>, TaskletError> {
        let mut lines = Vec::with_capacity(self.keys.len());
        for key in &self.keys {
            match ctx.parameters.get(key) {
                Some(param) => lines.push(format!("{} ---> {}", key.to_uppercase(), param.value)),
                None if self.require_all => {
                    return Err(TaskletError::MissingParameter(key.clone()))
                }
                None => {}
            }
        }
        Ok(lines)
    }
}

impl Tasklet for ParameterEchoTasklet {
    fn execute(&mut self, ctx: &StepContext<'_>) -> Result<(), TaskletError> {
        info!("Hello, world!");
        for line in self.lines(ctx)? {
            info!("{}", line);
        }
        Ok(())
    }
}
