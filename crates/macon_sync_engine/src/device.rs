//! Device interface abstraction.

use crate::error::{DeviceError, DeviceResult};
use crate::mapping::ValueType;
use macon_document::Value;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reads and writes named controller variables.
///
/// Symbols are fully qualified (`<program>.<variable>`). Values cross the
/// trait already coerced to the declared [`ValueType`].
pub trait DeviceInterface: Send + Sync {
    /// Reads a variable.
    fn read(&self, symbol: &str, value_type: ValueType) -> DeviceResult<Value>;

    /// Writes a variable.
    fn write(&self, symbol: &str, value: &Value, value_type: ValueType) -> DeviceResult<()>;
}

impl<T: DeviceInterface + ?Sized> DeviceInterface for &T {
    fn read(&self, symbol: &str, value_type: ValueType) -> DeviceResult<Value> {
        (**self).read(symbol, value_type)
    }

    fn write(&self, symbol: &str, value: &Value, value_type: ValueType) -> DeviceResult<()> {
        (**self).write(symbol, value, value_type)
    }
}

#[derive(Debug)]
struct MemoryDeviceState {
    symbols: HashMap<String, Value>,
    failing_reads: HashSet<String>,
    failing_writes: HashSet<String>,
    connected: bool,
    writes: Vec<(String, Value)>,
}

impl Default for MemoryDeviceState {
    fn default() -> Self {
        Self {
            symbols: HashMap::new(),
            failing_reads: HashSet::new(),
            failing_writes: HashSet::new(),
            connected: true,
            writes: Vec::new(),
        }
    }
}

/// An in-memory controller for testing.
///
/// Clones share the same variables, so a test can play "control logic" on
/// one handle while the engine uses another.
#[derive(Debug, Clone, Default)]
pub struct MemoryDevice {
    state: Arc<Mutex<MemoryDeviceState>>,
}

impl MemoryDevice {
    /// Creates a device with no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable, or changes it as control logic would.
    pub fn define(&self, symbol: impl Into<String>, value: impl Into<Value>) {
        self.state.lock().symbols.insert(symbol.into(), value.into());
    }

    /// Current value of a variable.
    pub fn value(&self, symbol: &str) -> Option<Value> {
        self.state.lock().symbols.get(symbol).cloned()
    }

    /// Makes reads of `symbol` fail with a device status error.
    pub fn fail_reads_of(&self, symbol: impl Into<String>) {
        self.state.lock().failing_reads.insert(symbol.into());
    }

    /// Makes writes of `symbol` fail with a device status error.
    pub fn fail_writes_of(&self, symbol: impl Into<String>) {
        self.state.lock().failing_writes.insert(symbol.into());
    }

    /// Clears all injected read and write failures.
    pub fn clear_faults(&self) {
        let mut state = self.state.lock();
        state.failing_reads.clear();
        state.failing_writes.clear();
    }

    /// Simulates losing or regaining the session.
    pub fn set_connected(&self, connected: bool) {
        self.state.lock().connected = connected;
    }

    /// Every successful write so far, in order.
    pub fn writes(&self) -> Vec<(String, Value)> {
        self.state.lock().writes.clone()
    }
}

impl DeviceInterface for MemoryDevice {
    fn read(&self, symbol: &str, value_type: ValueType) -> DeviceResult<Value> {
        let state = self.state.lock();
        if !state.connected {
            return Err(DeviceError::NotConnected);
        }
        if state.failing_reads.contains(symbol) {
            return Err(DeviceError::status(0x0701, "service not supported"));
        }
        let current = state
            .symbols
            .get(symbol)
            .ok_or_else(|| DeviceError::SymbolNotFound(symbol.to_string()))?;
        value_type
            .coerce(current)
            .ok_or_else(|| DeviceError::type_mismatch(symbol, value_type, current.kind()))
    }

    fn write(&self, symbol: &str, value: &Value, value_type: ValueType) -> DeviceResult<()> {
        let mut state = self.state.lock();
        if !state.connected {
            return Err(DeviceError::NotConnected);
        }
        if state.failing_writes.contains(symbol) {
            return Err(DeviceError::status(0x0701, "service not supported"));
        }
        if !state.symbols.contains_key(symbol) {
            return Err(DeviceError::SymbolNotFound(symbol.to_string()));
        }
        let coerced = value_type
            .coerce(value)
            .ok_or_else(|| DeviceError::type_mismatch(symbol, value_type, value.kind()))?;
        state.symbols.insert(symbol.to_string(), coerced.clone());
        state.writes.push((symbol.to_string(), coerced));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_back_defined_value() {
        let device = MemoryDevice::new();
        device.define("MACONDatabase.sUsername", "alice");

        let value = device.read("MACONDatabase.sUsername", ValueType::String).unwrap();
        assert_eq!(value, Value::from("alice"));
    }

    #[test]
    fn unknown_symbol() {
        let device = MemoryDevice::new();
        let err = device.read("MAIN.nothing", ValueType::Bool).unwrap_err();
        assert!(matches!(err, DeviceError::SymbolNotFound(_)));
        assert!(!err.is_connectivity());
    }

    #[test]
    fn write_coerces_to_declared_type() {
        let device = MemoryDevice::new();
        device.define("MachineDatabase.axes_1_min", 0.0_f64);

        device
            .write("MachineDatabase.axes_1_min", &Value::Integer(5), ValueType::Float)
            .unwrap();
        assert_eq!(
            device.value("MachineDatabase.axes_1_min"),
            Some(Value::Float(5.0))
        );
        assert_eq!(device.writes().len(), 1);
    }

    #[test]
    fn write_rejects_wrong_type() {
        let device = MemoryDevice::new();
        device.define("MachineDatabase.machineId", "M-1");

        let err = device
            .write("MachineDatabase.machineId", &Value::Integer(5), ValueType::String)
            .unwrap_err();
        assert!(matches!(err, DeviceError::TypeMismatch { .. }));
        assert_eq!(device.value("MachineDatabase.machineId"), Some(Value::from("M-1")));
    }

    #[test]
    fn injected_faults() {
        let device = MemoryDevice::new();
        device.define("A.x", 1_i64);
        device.fail_reads_of("A.x");
        assert!(matches!(
            device.read("A.x", ValueType::Integer),
            Err(DeviceError::Status { .. })
        ));

        device.clear_faults();
        assert!(device.read("A.x", ValueType::Integer).is_ok());

        device.set_connected(false);
        let err = device.read("A.x", ValueType::Integer).unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn clones_share_state() {
        let device = MemoryDevice::new();
        let plc = device.clone();
        plc.define("A.flag", true);
        assert_eq!(device.read("A.flag", ValueType::Bool).unwrap(), Value::Bool(true));
    }
}
