//! # file-organize CLI
//!
//! Command-line interface for the file organizer.
//!
//! ## Usage
//! ```bash
//! file-organize organize ~/Downloads --target ~/Sorted --dry-run
//! file-organize undo --json
//! ```

mod cli;

use file_organizer::Result;

fn main() -> Result<()> {
    cli::run()
}
