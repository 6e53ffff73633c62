use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub quantity: String,
}

/// A recipe invented by the model, returned through structured output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub title: String,
    pub ingredients: Vec<Ingredient>,
    pub preparation_description: String,
    /// Kept as the model wrote it, `35` stays an integer
    pub time_in_min: Number,
}

impl Recipe {
    pub const SCHEMA_NAME: &'static str = "recipe";

    /// JSON schema handed to the provider as the response format
    pub fn json_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "ingredients": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "name": { "type": "string" },
                            "quantity": { "type": "string" }
                        },
                        "required": ["name", "quantity"],
                        "additionalProperties": false
                    }
                },
                "preparation_description": { "type": "string" },
                "time_in_min": { "type": "number" }
            },
            "required": ["title", "ingredients", "preparation_description", "time_in_min"],
            "additionalProperties": false
        })
    }
}
