//! # CLI Module
//!
//! Command-line access to the schema toolkit, shipped as the `brrtkit`
//! binary.
//!
//! ## Commands
//!
//! ### `schema`
//!
//! Print the OpenAPI `components` object (model schemas plus security
//! schemes) for a YAML declaration file:
//!
//! ```bash
//! brrtkit schema --models models.yaml
//! ```
//!
//! ### `validate`
//!
//! Validate a JSON document against one declared model and print the result
//! envelope. Exits non-zero when any column reports an error:
//!
//! ```bash
//! brrtkit validate --models models.yaml --model User --input user.json
//! ```

mod commands;


pub use commands::{execute, run_cli, Cli, CommandOutput, Commands};
