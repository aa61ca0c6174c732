use arcade_types::MachineConfigError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid machine configuration: {0}")]
    Config(#[from] MachineConfigError),
    #[error("machine {machine_id} has no item with a positive weight")]
    NoPullableItems { machine_id: i64 },
}
