//! CLI Exit Code Registry
//!
//! Single source of truth for `smeta` exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                        |
//! |------|------------------------------------------------|
//! | 0    | Success                                        |
//! | 1    | General error                                  |
//! | 2    | Usage error (bad args, missing file)           |
//! | 3    | Parse error (undecodable input file)           |
//! | 4    | Compare found price differences                |
//! | 5    | Import commit finished with per-item errors    |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// An input file could not be decoded.
pub const EXIT_PARSE: u8 = 3;

/// `compare` ran successfully and found rows outside tolerance.
/// Like `diff(1)`, a nonzero code means "lists differ".
pub const EXIT_DIFFS: u8 = 4;

/// `import` commit completed but some rows failed to write.
pub const EXIT_PARTIAL_COMMIT: u8 = 5;
