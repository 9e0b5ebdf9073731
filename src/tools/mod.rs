//! Agent tool boundary
//!
//! Tools take a typed, schema-described input and return JSON. An
//! orchestrating agent discovers them through [`ToolSpec`]s and calls
//! them with raw JSON via [`AgentTool::call_json`].

mod arena;
mod types;

pub use arena::{ArenaTool, ArenaToolInput, TradeArgs};
pub use types::AnyJson;

use crate::{Error, Result};
use async_trait::async_trait;
use schemars::{JsonSchema, Schema};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const TOOL_ARENA: &str = "arena/trade_arena";

/// Name, description and input schema of one tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Schema,
}

#[async_trait]
pub trait AgentTool: Send + Sync {
    const NAME: &'static str;
    type Input: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize;

    fn description(&self) -> &'static str;

    async fn execute(&self, input: Self::Input) -> Result<Self::Output>;

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: Self::NAME.to_string(),
            description: self.description().to_string(),
            input_schema: schemars::schema_for!(Self::Input),
        }
    }

    /// Decode raw arguments, run, and encode the output
    async fn call_json(&self, args: Value) -> Result<Value> {
        let input: Self::Input = serde_json::from_value(args)
            .map_err(|e| Error::validation("args", e.to_string()))?;
        let output = self.execute(input).await?;
        Ok(serde_json::to_value(output)?)
    }
}
