//! Device discovery query.

use crate::output;

/// Device line reported when the scheduler enumerates backends:
/// `class scheme "make-and-model" "info" "device-id"`.
pub const DISCOVERY_LINE: &str = "direct printhub \"Unknown\" \"PrintHub PDF Printer\" \
                                  \"MFG:PrintHub;MDL:PDF Printer;DES:Virtual PDF Printer;\"";

/// Print the discovery line. Never touches the spool.
pub fn execute() -> i32 {
    output::print_line(DISCOVERY_LINE);
    0
}
