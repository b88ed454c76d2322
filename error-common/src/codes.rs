// Causal and error codes
// Codes that travel with findings are stable business identifiers and must
// not be renumbered; error codes are used in logs and operator output.

/// Causal codes attached to candidate returns (person not eligible).
pub mod eligibility {
    pub const BEFORE_EFFECTIVE_DATE: &str = "DE1601";
    pub const AFTER_TERMINATION_DATE: &str = "DE1602";
    pub const NOT_IN_REGISTRY: &str = "DE1603";
    pub const INACTIVE_AFFILIATION: &str = "DE1604";
}

/// Causal codes attached to candidate deductions.
pub mod deduction {
    pub const UNKNOWN_CODE: &str = "FA5701";
    pub const DISABLED_CODE: &str = "FA5702";
    pub const SEX_RESTRICTION: &str = "PE0101";
    pub const SETTING_RESTRICTION: &str = "PE0102";
    pub const MISSING_DIAGNOSIS: &str = "SO0301";
}

pub mod structural {
    pub const MALFORMED_ROOT: &str = "STRUCT_1001";
    pub const MISSING_PERSONS: &str = "STRUCT_1002";
    pub const MISSING_ROOT_FIELD: &str = "STRUCT_1003";
    pub const MALFORMED_RECORD: &str = "RECORD_1101";
    pub const INVALID_STATUS_TRANSITION: &str = "STRUCT_1004";
}

pub mod scheduling {
    pub const INVALID_WEIGHTS: &str = "SCHED_2001";
    pub const ROSTER_UNAVAILABLE: &str = "SCHED_2002";
}

pub mod workflow {
    pub const ALREADY_RESOLVED: &str = "WF_3001";
    pub const STALE_LOAD: &str = "WF_3002";
    pub const CAPACITY_EXCEEDED: &str = "WF_3003";
    pub const INVALID_MODIFICATION: &str = "WF_3004";
    pub const NOT_FOUND: &str = "WF_3005";
    pub const INVALID_TRANSITION: &str = "WF_3006";
}

pub mod storage {
    pub const NOT_FOUND: &str = "STORE_4001";
    pub const CONFLICT: &str = "STORE_4002";
    pub const UNAVAILABLE: &str = "STORE_4003";
}

pub mod configuration {
    pub const INVALID_VALUE: &str = "CONFIG_5001";
    pub const SOURCE_FAILED: &str = "CONFIG_5002";
}
