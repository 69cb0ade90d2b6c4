// Library root
// -----------
// The binary (`main.rs`) only parses the command line, loads configuration
// and hands over to `dispatch`.
//
// Module responsibilities:
// - `api`: HTTP calls to the GTR submission endpoints and the action
//   envelope they expect.
// - `cli`: command-line definition and validation of the positional
//   arguments.
// - `config`: API key, base URL, timeout and log level from the
//   environment.
// - `dispatch`: runs one action, including the batch variants, and prints
//   the result records.
pub mod api;
pub mod cli;
pub mod config;
pub mod dispatch;
