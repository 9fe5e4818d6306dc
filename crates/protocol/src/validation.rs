use crate::{
    AgentInfo, IntakeRequest, RepoInfo, TaskInfo, TelemetryPrefs, INTAKE_SCHEMA_VERSION,
};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why an intake request was rejected at the transport boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("request body is not valid JSON")]
    InvalidJson,

    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("schema_version must be \"aip-1\"")]
    UnsupportedSchemaVersion,

    #[error("agent.tool must be a non-empty string")]
    MissingAgentTool,

    #[error("task.tags must be an array of strings")]
    InvalidTags,

    #[error("field {0} has the wrong type")]
    InvalidField(&'static str),
}

impl ValidationError {
    /// Machine-readable reason returned in `{"error": ...}`.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidJson => "invalid_json",
            ValidationError::NotAnObject => "invalid_request",
            ValidationError::UnsupportedSchemaVersion => "unsupported_schema_version",
            ValidationError::MissingAgentTool => "missing_agent_tool",
            ValidationError::InvalidTags => "invalid_tags",
            ValidationError::InvalidField(field) => match *field {
                "agent" => "invalid_agent",
                "agent.tool_version" => "invalid_tool_version",
                "task" => "invalid_task",
                "telemetry" | "telemetry.opt_out" => "invalid_telemetry",
                _ => "invalid_repo",
            },
        }
    }
}

pub fn parse_intake_request_bytes(body: &[u8]) -> Result<IntakeRequest, ValidationError> {
    let value: Value = serde_json::from_slice(body).map_err(|_| ValidationError::InvalidJson)?;
    parse_intake_request(&value)
}

/// Strictly validates a decoded intake request.
///
/// Unknown fields are ignored; known fields must have the documented types.
pub fn parse_intake_request(value: &Value) -> Result<IntakeRequest, ValidationError> {
    let root = value.as_object().ok_or(ValidationError::NotAnObject)?;

    match root.get("schema_version").and_then(Value::as_str) {
        Some(INTAKE_SCHEMA_VERSION) => {}
        _ => return Err(ValidationError::UnsupportedSchemaVersion),
    }

    let agent = parse_agent(root)?;
    let task = parse_task(root)?;
    let telemetry = parse_telemetry(root)?;
    let repo = parse_repo(root)?;

    Ok(IntakeRequest {
        schema_version: INTAKE_SCHEMA_VERSION.to_string(),
        agent,
        task,
        telemetry,
        repo,
    })
}

fn parse_agent(root: &Map<String, Value>) -> Result<AgentInfo, ValidationError> {
    let agent = match root.get("agent") {
        Some(Value::Object(agent)) => agent,
        Some(_) => return Err(ValidationError::InvalidField("agent")),
        None => return Err(ValidationError::MissingAgentTool),
    };

    let tool = agent
        .get("tool")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .ok_or(ValidationError::MissingAgentTool)?;

    let tool_version = match agent.get("tool_version") {
        None | Some(Value::Null) => None,
        Some(Value::String(version)) => Some(version.clone()),
        Some(_) => return Err(ValidationError::InvalidField("agent.tool_version")),
    };

    Ok(AgentInfo {
        tool: tool.to_string(),
        tool_version,
    })
}

fn parse_task(root: &Map<String, Value>) -> Result<TaskInfo, ValidationError> {
    let task = match root.get("task") {
        None | Some(Value::Null) => return Ok(TaskInfo::default()),
        Some(Value::Object(task)) => task,
        Some(_) => return Err(ValidationError::InvalidField("task")),
    };

    let tags = match task.get("tags") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .ok_or(ValidationError::InvalidTags)?,
        Some(_) => return Err(ValidationError::InvalidTags),
    };

    Ok(TaskInfo { tags })
}

fn parse_telemetry(root: &Map<String, Value>) -> Result<TelemetryPrefs, ValidationError> {
    let telemetry = match root.get("telemetry") {
        None | Some(Value::Null) => return Ok(TelemetryPrefs::default()),
        Some(Value::Object(telemetry)) => telemetry,
        Some(_) => return Err(ValidationError::InvalidField("telemetry")),
    };

    let opt_out = match telemetry.get("opt_out") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(ValidationError::InvalidField("telemetry.opt_out")),
    };

    Ok(TelemetryPrefs { opt_out })
}

fn parse_repo(root: &Map<String, Value>) -> Result<Option<RepoInfo>, ValidationError> {
    let repo = match root.get("repo") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(repo)) => repo,
        Some(_) => return Err(ValidationError::InvalidField("repo")),
    };

    let git_ref = match repo.get("ref") {
        None | Some(Value::Null) => None,
        Some(Value::String(git_ref)) => Some(git_ref.clone()),
        Some(_) => return Err(ValidationError::InvalidField("repo.ref")),
    };

    Ok(Some(RepoInfo { git_ref }))
}
