//! exit codes for mergegate commands
//!
//! 0 means the command ran and the gate passed. scripts can tell a failed
//! gate (2) or a waiting gate (3) apart from errors in the input.

use crate::conclusion::Conclusion;

/// command completed successfully, or the gate concluded SUCCESS
pub const SUCCESS: i32 = 0;

/// general or unknown error
pub const ERROR: i32 = 1;

/// the gate concluded FAILURE
pub const CONCLUSION_FAILURE: i32 = 2;

/// the gate concluded PENDING
pub const CONCLUSION_PENDING: i32 = 3;

/// invalid command-line arguments or subject input
pub const INVALID_ARGS: i32 = 4;

/// configuration file error or invalid condition
pub const CONFIG_ERROR: i32 = 5;

/// negated condition inside an `or` group
pub const UNSUPPORTED_COMBINATION: i32 = 6;

pub fn for_conclusion(conclusion: Conclusion) -> i32 {
    match conclusion {
        Conclusion::Success => SUCCESS,
        Conclusion::Failure => CONCLUSION_FAILURE,
        Conclusion::Pending => CONCLUSION_PENDING,
    }
}
