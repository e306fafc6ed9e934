#![allow(clippy::too_many_arguments)]
#![allow(clippy::upper_case_acronyms)]
#![allow(clippy::type_complexity)]

pub mod account;
pub mod builtin_functions;
pub mod check;
pub mod config;
pub mod dct;
pub mod error;
pub mod gas;
pub mod interfaces;
pub mod vm;

#[cfg(test)]
mod mock;

pub use builtin_functions::{
    ArgsCreateBuiltInFunctionContainer, BuiltInFuncCreator, BuiltInFunctionContainer,
    BuiltInFunctionName, BuiltinFunction,
};
pub use error::{BuiltInError, BuiltInResult};
pub use gas::{GasCost, GasScheduleMap};
