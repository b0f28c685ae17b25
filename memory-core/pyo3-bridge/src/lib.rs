use pyo3::prelude::*;

mod memory_bindings;

use memory_bindings::PyMemoryEngine;

#[pymodule]
fn pyo3_bridge(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_class::<PyMemoryEngine>()?;

    // Initialize observability
    memory_core::observability::setup_logging(memory_core::observability::LogFormat::Text);

    Ok(())
}
