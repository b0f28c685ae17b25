use memory_core::error::MemoryError;
use memory_core::storage::FileAction;
use memory_core::{MemoryConfig, MemoryEngine};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use serde::Serialize;
use std::path::PathBuf;

fn to_py_err(e: MemoryError) -> PyErr {
    match e {
        MemoryError::InvalidInput(msg) | MemoryError::Config(msg) => PyValueError::new_err(msg),
        other => PyRuntimeError::new_err(other.to_string()),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> PyResult<String> {
    serde_json::to_string(value)
        .map_err(|e| PyRuntimeError::new_err(format!("Failed to serialize: {}", e)))
}

/// Structured values cross the boundary as JSON strings.
#[pyclass]
pub struct PyMemoryEngine {
    inner: MemoryEngine,
}

#[pymethods]
impl PyMemoryEngine {
    #[new]
    #[pyo3(signature = (config_path=None, store_path=None))]
    fn new(config_path: Option<String>, store_path: Option<String>) -> PyResult<Self> {
        let config_path = config_path.map(PathBuf::from);
        let mut config = MemoryConfig::load(config_path.as_deref()).map_err(to_py_err)?;
        if let Some(store) = store_path {
            config = config.with_store_path(store);
        }
        let inner = MemoryEngine::open(config).map_err(to_py_err)?;
        Ok(Self { inner })
    }

    #[pyo3(signature = (user_input, assistant_response, executed_code=None, code_result=None))]
    fn add_conversation(
        &mut self,
        user_input: &str,
        assistant_response: &str,
        executed_code: Option<&str>,
        code_result: Option<&str>,
    ) -> String {
        self.inner
            .add_conversation(user_input, assistant_response, executed_code, code_result)
    }

    #[pyo3(signature = (path, action, conversation_id=None))]
    fn add_file_interaction(
        &mut self,
        path: &str,
        action: &str,
        conversation_id: Option<&str>,
    ) -> PyResult<String> {
        let action: FileAction = action.parse().map_err(to_py_err)?;
        Ok(self.inner.add_file_interaction(path, action, conversation_id))
    }

    #[pyo3(signature = (command, result, conversation_id=None))]
    fn add_command(&mut self, command: &str, result: &str, conversation_id: Option<&str>) {
        self.inner.add_command(command, result, conversation_id);
    }

    fn link_conversations(&mut self, source_id: &str, target_id: &str, relation: &str) -> bool {
        self.inner.link_conversations(source_id, target_id, relation)
    }

    fn get_conversation(&self, id: &str) -> PyResult<Option<String>> {
        self.inner
            .store()
            .get_conversation(id)
            .map(|conv| to_json(conv))
            .transpose()
    }

    #[pyo3(signature = (count=5))]
    fn get_recent_conversations(&self, count: usize) -> PyResult<String> {
        to_json(self.inner.store().get_recent_conversations(count))
    }

    fn get_file_history(&self, path: &str) -> PyResult<String> {
        to_json(self.inner.store().get_file_history(path))
    }

    fn search_conversations(&self, query: &str) -> PyResult<String> {
        to_json(&self.inner.store().search_conversations(query))
    }

    /// Returns `(path, action)` pairs that were logged.
    #[pyo3(signature = (code, conversation_id=None))]
    fn record_code_references(
        &mut self,
        code: &str,
        conversation_id: Option<&str>,
    ) -> Vec<(String, String)> {
        self.inner
            .record_code_references(code, conversation_id)
            .into_iter()
            .map(|r| (r.path, r.action.to_string()))
            .collect()
    }

    fn resolve(&self, command: &str) -> String {
        self.inner.resolve(command).text
    }

    fn build_context(&self, query: &str) -> PyResult<String> {
        to_json(&self.inner.build_context(query))
    }

    fn context_for_prompt(&self, query: &str) -> String {
        self.inner.context_for_prompt(query)
    }

    /// `result_json` must be valid JSON; pass `json.dumps(value)`.
    fn store_result(&mut self, kind: &str, result_json: &str) -> PyResult<()> {
        let value = serde_json::from_str(result_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid result JSON: {}", e)))?;
        self.inner.store_result(kind, value);
        Ok(())
    }

    fn get_result(&self, kind: &str) -> PyResult<Option<String>> {
        self.inner.get_result(kind).map(|v| to_json(v)).transpose()
    }

    fn get_file_by_ordinal(&self, reference: &str) -> Option<String> {
        self.inner.get_file_by_ordinal(reference).map(str::to_string)
    }

    fn last_operation(&self) -> PyResult<String> {
        to_json(self.inner.short_term().last_operation())
    }

    /// Reply text, or `None` when `text` is not a memory command.
    fn handle_memory_command(&mut self, text: &str) -> Option<String> {
        self.inner.handle_memory_command(text)
    }

    #[pyo3(signature = (name, args, conversation_id=None))]
    fn invoke(&mut self, name: &str, args: Vec<String>, conversation_id: Option<&str>) -> PyResult<String> {
        self.inner
            .invoke_capability(name, &args, conversation_id)
            .map_err(to_py_err)
    }

    fn flush(&mut self) -> PyResult<()> {
        self.inner.flush().map_err(to_py_err)
    }

    fn clear(&mut self) {
        self.inner.clear();
    }

    fn metrics(&self) -> PyResult<String> {
        self.inner.metrics().export().map_err(to_py_err)
    }
}
