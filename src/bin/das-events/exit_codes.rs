pub const SUCCESS: i32 = 0;
/// Missing or unreadable input, invalid configuration
pub const INPUT_ERROR: i32 = 1;
/// Detection ran but failed, or results could not be written
pub const EXECUTION_ERROR: i32 = 2;
/// Batch finished with some files failed
pub const PARTIAL_FAILURE: i32 = 3;
