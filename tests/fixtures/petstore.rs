//! @openapi:info
//! version: 1.0.0
//! title: Petstore
//! description: Pets and their owners

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A pet
/// @openapi:schema
#[derive(Serialize, Deserialize)]
pub struct Pet {
    #[validate(required)]
    pub name: String,
    pub age: Option<i64>,
    #[serde(rename = "birthDate")]
    pub birth_date: chrono::DateTime<chrono::Utc>,
    pub photo: Vec<u8>,
    pub kind: Kind,
    pub owner: Option<Owner>,
    #[serde(skip)]
    pub internal_id: u64,
    pub labels: HashMap<String, serde_json::Value>,
}

/// @openapi:schema
/// @openapi:example dog
#[derive(Serialize, Deserialize)]
pub enum Kind {
    #[serde(rename = "dog")]
    Dog,
    #[serde(rename = "cat")]
    Cat,
}

/// @openapi:schema:Person
#[derive(Serialize, Deserialize)]
pub struct Owner {
    #[validate(required)]
    pub email: String,
    #[serde(flatten)]
    pub address: Address,
}

/// @openapi:schema
#[derive(Serialize, Deserialize)]
pub struct Address {
    pub city: String,
}

/// @openapi:schema:Pets
pub type PetList = Vec<Pet>;

/// Not exported: no schema marker
pub struct Internal {
    pub secret: String,
}

pub struct Handlers;

impl Handlers {
    /// @openapi:path
    /// /pets:
    ///   get:
    ///     summary: List pets
    ///     operationId: listPets
    ///     responses:
    ///       "200":
    ///         description: The pets
    ///         content:
    ///           application/json:
    ///             schema:
    ///               $ref: "#/components/schemas/Pets"
    pub fn list_pets() {}

    /// @openapi:path
    /// /pets/{name}:
    ///   get:
    ///     summary: Fetch a pet
    ///     parameters:
    ///       - name: name
    ///         in: path
    ///         required: true
    ///         schema:
    ///           type: string
    ///     responses:
    ///       "200":
    ///         description: The pet
    pub fn get_pet() {}
}
