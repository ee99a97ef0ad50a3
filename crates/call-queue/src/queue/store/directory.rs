use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::queue::domain::{Agent, AgentId, SubjectId, SubjectProfile};
use crate::queue::repository::{AgentDirectory, StoreError, SubjectDirectory};

/// Snapshot of the subject and operator directories held in memory.
///
/// The authoritative records live in the back office; this is the read-only copy the
/// queue joins against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticDirectory {
    #[serde(default)]
    subjects: Vec<SubjectProfile>,
    #[serde(default)]
    agents: Vec<Agent>,
}

impl StaticDirectory {
    pub fn new(subjects: Vec<SubjectProfile>, agents: Vec<Agent>) -> Self {
        Self { subjects, agents }
    }

    /// Load a `{ "subjects": [...], "agents": [...] }` JSON document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DirectoryError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| DirectoryError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, DirectoryError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn with_subject(mut self, subject: SubjectProfile) -> Self {
        self.subjects.retain(|existing| existing.id != subject.id);
        self.subjects.push(subject);
        self
    }

    pub fn with_agent(mut self, agent: Agent) -> Self {
        self.agents.retain(|existing| existing.id != agent.id);
        self.agents.push(agent);
        self
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }
}

impl SubjectDirectory for StaticDirectory {
    fn subjects(
        &self,
        ids: &[SubjectId],
    ) -> Result<HashMap<SubjectId, SubjectProfile>, StoreError> {
        Ok(self
            .subjects
            .iter()
            .filter(|subject| ids.contains(&subject.id))
            .map(|subject| (subject.id, subject.clone()))
            .collect())
    }
}

impl AgentDirectory for StaticDirectory {
    fn call_agents(&self) -> Result<Vec<Agent>, StoreError> {
        let mut agents: Vec<Agent> = self
            .agents
            .iter()
            .filter(|agent| agent.role.handles_calls())
            .cloned()
            .collect();
        agents.sort_by(|a, b| {
            a.first_name
                .cmp(&b.first_name)
                .then_with(|| a.last_name.cmp(&b.last_name))
        });
        Ok(agents)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("unable to read directory file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("directory file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
