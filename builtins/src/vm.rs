//! Call input and output exchanged with the VM dispatcher.

use indexmap::IndexMap;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

/// Outcome of a built-in call as seen by the VM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnCode {
    #[default]
    Ok,
    FunctionNotFound,
    FunctionWrongSignature,
    UserError,
    OutOfGas,
    ExecutionFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CallType {
    #[default]
    DirectCall,
    AsynchronousCall,
    AsynchronousCallBack,
}

/// Input of a protocol call routed to a built-in function
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractCallInput {
    pub caller_addr: Vec<u8>,
    pub recipient_addr: Vec<u8>,
    pub call_value: BigUint,
    pub arguments: Vec<Vec<u8>>,
    pub gas_provided: u64,
    pub call_type: CallType,
    pub function: String,
    /// Co-signer of the transaction when the sender is guarded
    pub tx_guardian: Vec<u8>,
    /// Set on the destination shard when the original call failed
    pub return_call_after_error: bool,
}

/// Event recorded for indexers and auditors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub identifier: Vec<u8>,
    pub address: Vec<u8>,
    pub topics: Vec<Vec<u8>>,
    pub data: Vec<u8>,
}

/// Continuation sent to another account, possibly on another shard
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTransfer {
    pub value: BigUint,
    pub gas_limit: u64,
    pub data: Vec<u8>,
    pub call_type: CallType,
    pub sender_address: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputAccount {
    pub address: Vec<u8>,
    pub balance_delta: BigUint,
    pub output_transfers: Vec<OutputTransfer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmOutput {
    pub return_code: ReturnCode,
    pub return_data: Vec<Vec<u8>>,
    pub gas_remaining: u64,
    pub output_accounts: IndexMap<Vec<u8>, OutputAccount>,
    pub logs: Vec<LogEntry>,
}

impl VmOutput {
    /// Successful output leaving `gas_remaining` to the caller
    pub fn ok(gas_remaining: u64) -> Self {
        Self {
            return_code: ReturnCode::Ok,
            gas_remaining,
            ..Default::default()
        }
    }

    /// Append a transfer to the output account of `address`
    pub fn add_output_transfer(&mut self, address: &[u8], transfer: OutputTransfer) {
        self.output_accounts
            .entry(address.to_vec())
            .or_insert_with(|| OutputAccount {
                address: address.to_vec(),
                ..Default::default()
            })
            .output_transfers
            .push(transfer);
    }
}
