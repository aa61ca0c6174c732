//! Claw catch oracle.

use arcade_types::{ClawMachine, MachineConfigError, Verdict};

use crate::{error::EngineError, sampler::Sampler};

/// Rolls a catch verdict for every machine item, in declared order.
///
/// Fails before drawing anything if an item could never be caught.
pub fn pre_roll(sampler: &Sampler, machine: &ClawMachine) -> Result<Vec<Verdict>, EngineError> {
    if machine.items.is_empty() {
        return Err(MachineConfigError::Empty {
            machine_id: machine.id,
        }
        .into());
    }
    if let Some(slot) = machine
        .items
        .iter()
        .find(|slot| slot.item.catch_percentage <= 0)
    {
        return Err(MachineConfigError::ZeroCatchPercentage {
            item_id: slot.item.id,
        }
        .into());
    }

    Ok(machine
        .items
        .iter()
        .map(|slot| Verdict {
            item_id: slot.item.id,
            name: slot.item.name.clone(),
            success: sampler.roll(slot.item.catch_percentage),
        })
        .collect())
}
