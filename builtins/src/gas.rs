//! Gas cost tables built from the raw gas schedule.
//!
//! The schedule arrives as a two level map `category -> key -> cost`. Every
//! key listed below is mandatory and must be non-zero.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::{BuiltInError, BuiltInResult};

/// Raw gas schedule as loaded from configuration
pub type GasScheduleMap = HashMap<String, HashMap<String, u64>>;

pub const BASE_OPERATION_COST: &str = "BaseOperationCost";
pub const BUILT_IN_COST: &str = "BuiltInCost";

fn required(category: &str, map: &HashMap<String, u64>, key: &str) -> BuiltInResult<u64> {
    match map.get(key) {
        Some(value) if *value > 0 => Ok(*value),
        _ => Err(BuiltInError::InvalidGasCost {
            category: category.to_string(),
            key: key.to_string(),
        }),
    }
}

macro_rules! gas_table {
    ($(#[$meta:meta])* $name:ident, $category:expr, { $($field:ident => $key:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub struct $name {
            $(
                #[serde(rename = $key)]
                pub $field: u64,
            )+
        }

        impl $name {
            /// Keys required in the schedule category
            pub const KEYS: &'static [&'static str] = &[$($key),+];

            fn from_map(map: &HashMap<String, u64>) -> BuiltInResult<Self> {
                Ok(Self {
                    $($field: required($category, map, $key)?,)+
                })
            }
        }
    };
}

gas_table!(
    /// Per-byte and per-operation costs shared by many functions
    BaseOperationCost, BASE_OPERATION_COST, {
        store_per_byte => "StorePerByte",
        release_per_byte => "ReleasePerByte",
        data_copy_per_byte => "DataCopyPerByte",
        persist_per_byte => "PersistPerByte",
        compile_per_byte => "CompilePerByte",
        aot_prepare_per_byte => "AoTPreparePerByte",
        get_code => "GetCode",
    }
);

gas_table!(
    /// Fixed cost of every built-in function
    BuiltInCost, BUILT_IN_COST, {
        change_owner_address => "ChangeOwnerAddress",
        claim_developer_rewards => "ClaimDeveloperRewards",
        save_user_name => "SaveUserName",
        save_key_value => "SaveKeyValue",
        dct_transfer => "DCTTransfer",
        dct_burn => "DCTBurn",
        dct_local_mint => "DCTLocalMint",
        dct_local_burn => "DCTLocalBurn",
        dct_nft_create => "DCTNFTCreate",
        dct_nft_add_quantity => "DCTNFTAddQuantity",
        dct_nft_burn => "DCTNFTBurn",
        dct_nft_transfer => "DCTNFTTransfer",
        dct_nft_change_create_owner => "DCTNFTChangeCreateOwner",
        dct_nft_add_uri => "DCTNFTAddUri",
        dct_nft_update_attributes => "DCTNFTUpdateAttributes",
        dct_nft_multi_transfer => "DCTNFTMultiTransfer",
        set_guardian => "SetGuardian",
        guard_account => "GuardAccount",
        un_guard_account => "UnGuardAccount",
        trie_load_per_node => "TrieLoadPerNode",
        trie_store_per_node => "TrieStorePerNode",
    }
);

/// Typed view over the gas schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasCost {
    #[serde(rename = "BaseOperationCost")]
    pub base_operation_cost: BaseOperationCost,
    #[serde(rename = "BuiltInCost")]
    pub built_in_cost: BuiltInCost,
}

impl GasCost {
    /// Build the cost tables, failing on any missing or zero entry
    pub fn from_schedule(schedule: &GasScheduleMap) -> BuiltInResult<Self> {
        let base = category(schedule, BASE_OPERATION_COST)?;
        let built_in = category(schedule, BUILT_IN_COST)?;

        Ok(Self {
            base_operation_cost: BaseOperationCost::from_map(base)?,
            built_in_cost: BuiltInCost::from_map(built_in)?,
        })
    }
}

fn category<'a>(
    schedule: &'a GasScheduleMap,
    name: &str,
) -> BuiltInResult<&'a HashMap<String, u64>> {
    schedule
        .get(name)
        .ok_or_else(|| BuiltInError::MissingGasCategory {
            category: name.to_string(),
        })
}

/// Parse a gas schedule from its JSON representation
pub fn gas_schedule_from_json(json: &str) -> BuiltInResult<GasScheduleMap> {
    serde_json::from_str(json).map_err(|e| BuiltInError::InvalidGasSchedule(e.to_string()))
}

/// Cost snapshot used by a single function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationCost {
    pub func_gas_cost: u64,
    pub base: BaseOperationCost,
}

/// Atomically replaceable cost snapshot of a function
///
/// Readers always see one complete snapshot, never a mix of two schedules.
#[derive(Debug)]
pub struct GasCostCell(ArcSwap<OperationCost>);

impl GasCostCell {
    pub fn new(func_gas_cost: u64, base: BaseOperationCost) -> Self {
        Self(ArcSwap::from_pointee(OperationCost {
            func_gas_cost,
            base,
        }))
    }

    pub fn with_func_cost(func_gas_cost: u64) -> Self {
        Self::new(func_gas_cost, BaseOperationCost::default())
    }

    pub fn snapshot(&self) -> Arc<OperationCost> {
        self.0.load_full()
    }

    pub fn func_gas_cost(&self) -> u64 {
        self.0.load().func_gas_cost
    }

    pub fn replace(&self, func_gas_cost: u64, base: BaseOperationCost) {
        self.0.store(Arc::new(OperationCost {
            func_gas_cost,
            base,
        }));
    }
}

#[cfg(test)]
pub(crate) fn filled_gas_schedule(value: u64) -> GasScheduleMap {
    let fill = |keys: &[&str]| -> HashMap<String, u64> {
        keys.iter().map(|k| (k.to_string(), value)).collect()
    };

    let mut schedule = GasScheduleMap::new();
    schedule.insert(BASE_OPERATION_COST.to_string(), fill(BaseOperationCost::KEYS));
    schedule.insert(BUILT_IN_COST.to_string(), fill(BuiltInCost::KEYS));
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_schedule_reads_every_key() {
        let mut schedule = filled_gas_schedule(1);
        schedule
            .get_mut(BUILT_IN_COST)
            .unwrap()
            .insert("DCTLocalBurn".to_string(), 42);

        let gas = GasCost::from_schedule(&schedule).unwrap();
        assert_eq!(gas.built_in_cost.dct_local_burn, 42);
        assert_eq!(gas.built_in_cost.claim_developer_rewards, 1);
        assert_eq!(gas.base_operation_cost.aot_prepare_per_byte, 1);
    }

    #[test]
    fn test_zero_value_rejected() {
        let mut schedule = filled_gas_schedule(1);
        schedule
            .get_mut(BUILT_IN_COST)
            .unwrap()
            .insert("ClaimDeveloperRewards".to_string(), 0);

        match GasCost::from_schedule(&schedule) {
            Err(BuiltInError::InvalidGasCost { category, key }) => {
                assert_eq!(category, BUILT_IN_COST);
                assert_eq!(key, "ClaimDeveloperRewards");
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_missing_key_and_category_rejected() {
        let mut schedule = filled_gas_schedule(1);
        schedule.get_mut(BASE_OPERATION_COST).unwrap().remove("GetCode");
        assert!(matches!(
            GasCost::from_schedule(&schedule),
            Err(BuiltInError::InvalidGasCost { .. })
        ));

        schedule.remove(BASE_OPERATION_COST);
        assert!(matches!(
            GasCost::from_schedule(&schedule),
            Err(BuiltInError::MissingGasCategory { .. })
        ));
    }

    #[test]
    fn test_schedule_from_json() {
        let json = serde_json::to_string(&filled_gas_schedule(3)).unwrap();
        let schedule = gas_schedule_from_json(&json).unwrap();
        let gas = GasCost::from_schedule(&schedule).unwrap();
        assert_eq!(gas.built_in_cost.trie_store_per_node, 3);
        assert!(gas_schedule_from_json("{").is_err());
    }

    #[test]
    fn test_cost_cell_replace() {
        let cell = GasCostCell::with_func_cost(50);
        assert_eq!(cell.func_gas_cost(), 50);
        let base = BaseOperationCost {
            store_per_byte: 2,
            ..Default::default()
        };
        cell.replace(500, base);
        let snapshot = cell.snapshot();
        assert_eq!(snapshot.func_gas_cost, 500);
        assert_eq!(snapshot.base.store_per_byte, 2);
    }
}
