//! Generate JSON Schema for the lazytree configuration
//!
//! Usage:
//!   cargo run --features dev-bins --bin generate_schema > lazytree.schema.json

use lazytree::config::TreeConfig;
use schemars::schema_for;

fn main() {
    let schema = schema_for!(TreeConfig);
    let output = serde_json::to_string_pretty(&schema).expect("Failed to serialize schema");
    println!("{}", output);
}
