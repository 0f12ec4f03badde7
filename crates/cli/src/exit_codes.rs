//! CLI Exit Code Registry
//!
//! Single source of truth for the `parqview` exit codes. Scripts rely on them.
//!
//! | Code | Meaning                                         |
//! |------|-------------------------------------------------|
//! | 0    | Success                                         |
//! | 1    | General error                                   |
//! | 2    | Usage error (bad arguments, unknown column/row) |
//! | 3    | File could not be loaded                        |
//! | 4    | File could not be saved                         |
//! | 5    | A value did not fit its column type             |

use parqview_engine::SessionError;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, addressing outside the table.
pub const EXIT_USAGE: u8 = 2;

/// Input file missing, unreadable, malformed or of an unknown type.
pub const EXIT_LOAD: u8 = 3;

/// Output could not be written or encoded.
pub const EXIT_SAVE: u8 = 4;

/// Cell text rejected by the column's type.
pub const EXIT_COERCION: u8 = 5;

/// Map a session error to its exit code
pub fn session_exit_code(err: &SessionError) -> u8 {
    match err {
        SessionError::Load(_) => EXIT_LOAD,
        SessionError::Save(_) | SessionError::NoDestination => EXIT_SAVE,
        SessionError::Coercion(_) => EXIT_COERCION,
        SessionError::Table(_) => EXIT_USAGE,
        SessionError::ReadOnly => EXIT_ERROR,
    }
}
